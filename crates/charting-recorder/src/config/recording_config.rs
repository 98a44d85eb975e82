use crate::config::{default_preferred_mime_types, default_tick_interval_ms, default_timeslice_ms};

use serde::{Deserialize, Serialize};

/// Capture timing and encoding preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Interval between emitted chunks, in milliseconds.
    #[serde(default = "default_timeslice_ms")]
    pub timeslice_ms: u64,

    /// Interval between duration updates, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Chunk encodings to try, best first.
    #[serde(default = "default_preferred_mime_types")]
    pub preferred_mime_types: Vec<String>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            timeslice_ms: default_timeslice_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            preferred_mime_types: default_preferred_mime_types(),
        }
    }
}
