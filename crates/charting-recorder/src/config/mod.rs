mod audio_config;
#[allow(clippy::module_inception)]
mod config;
mod output_config;
mod recording_config;
mod transcription_config;

pub(crate) use {
    audio_config::AudioConfig, config::Config, output_config::OutputConfig,
    recording_config::RecordingConfig, transcription_config::TranscriptionConfig,
};

use charting_recorder_core::capture::PREFERRED_MIME_TYPES;

pub(crate) const DEFAULT_TIMESLICE_MS: u64 = 1000;
/// Chunks must arrive at least once per second.
pub(crate) const MAX_TIMESLICE_MS: u64 = 1000;
pub(crate) const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
pub(crate) const DEFAULT_TRANSCRIPTION_ENABLED: bool = true;
pub(crate) const DEFAULT_TRANSCRIPTION_DELAY_MS: u64 = 1500;

pub(crate) fn default_timeslice_ms() -> u64 {
    DEFAULT_TIMESLICE_MS
}

pub(crate) fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

pub(crate) fn default_preferred_mime_types() -> Vec<String> {
    PREFERRED_MIME_TYPES.iter().map(|m| m.to_string()).collect()
}

pub(crate) fn default_transcription_enabled() -> bool {
    DEFAULT_TRANSCRIPTION_ENABLED
}

pub(crate) fn default_transcription_delay_ms() -> u64 {
    DEFAULT_TRANSCRIPTION_DELAY_MS
}
