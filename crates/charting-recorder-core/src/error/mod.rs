use error_location::ErrorLocation;
use thiserror::Error;

/// User-facing message for a refused microphone permission.
pub const PERMISSION_DENIED_MESSAGE: &str =
    "Microphone access denied. Please allow microphone access and try again.";

/// User-facing message for a missing input device.
pub const DEVICE_NOT_FOUND_MESSAGE: &str =
    "No microphone found. Please connect a microphone and try again.";

/// Recording errors with source location tracking.
///
/// Only [`AudioRecorder::start_recording`](crate::AudioRecorder::start_recording)
/// returns these; every other recorder operation degrades to a no-op.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// The user or the OS refused microphone access.
    #[error("Microphone access denied: {reason} {location}")]
    PermissionDenied {
        /// Message reported by the platform.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No audio input device is available.
    #[error("No microphone found: {reason} {location}")]
    DeviceNotFound {
        /// Message reported by the platform.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Any other failure acquiring or starting capture.
    #[error("Failed to start recording: {reason} {location}")]
    AcquisitionFailed {
        /// Message passed through from the platform.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A session is already starting, recording or paused.
    #[error("A recording is already in progress {location}")]
    AlreadyRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The recorder has been disposed.
    #[error("Recorder has been disposed {location}")]
    Disposed {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl RecorderError {
    /// Message suitable for `RecordingState::error` and for display in a UI.
    ///
    /// Unlike `Display`, this omits the source location.
    pub fn user_message(&self) -> String {
        match self {
            RecorderError::PermissionDenied { .. } => PERMISSION_DENIED_MESSAGE.to_string(),
            RecorderError::DeviceNotFound { .. } => DEVICE_NOT_FOUND_MESSAGE.to_string(),
            RecorderError::AcquisitionFailed { reason, .. } if reason.trim().is_empty() => {
                "Failed to start recording".to_string()
            }
            RecorderError::AcquisitionFailed { reason, .. } => reason.clone(),
            RecorderError::AlreadyRecording { .. } => "A recording is already in progress".to_string(),
            RecorderError::Disposed { .. } => "The recorder has been closed".to_string(),
        }
    }
}

/// Failures while turning captured chunks into a WAV payload.
///
/// Never surfaced to callers: the recorder logs these and falls back to the
/// originally captured blob.
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// The decoder has no support for this encoding.
    #[error("Unsupported audio format: {mime_type} {location}")]
    UnsupportedFormat {
        /// MIME type of the captured blob.
        mime_type: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The encoded payload could not be decoded.
    #[error("Failed to decode audio: {reason} {location}")]
    DecodeFailed {
        /// Description of the decode failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The decoded PCM cannot be written as a WAV container.
    #[error("Failed to encode WAV: {reason} {location}")]
    EncodeFailed {
        /// Description of the encode failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`RecorderError`].
pub type Result<T> = std::result::Result<T, RecorderError>;
