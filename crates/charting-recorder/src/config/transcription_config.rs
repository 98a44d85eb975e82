use crate::config::{default_transcription_delay_ms, default_transcription_enabled};

use serde::{Deserialize, Serialize};

/// Transcription of saved recordings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Transcribe each saved recording.
    #[serde(default = "default_transcription_enabled")]
    pub enabled: bool,

    /// Simulated processing time of the offline transcriber, in milliseconds.
    #[serde(default = "default_transcription_delay_ms")]
    pub simulated_delay_ms: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: default_transcription_enabled(),
            simulated_delay_ms: default_transcription_delay_ms(),
        }
    }
}
