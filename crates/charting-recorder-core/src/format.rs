/// Formats whole seconds as `MM:SS`.
///
/// Minutes are not wrapped at an hour: 3725 seconds is `62:05`.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
