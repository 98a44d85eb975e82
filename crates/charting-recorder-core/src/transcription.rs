//! Interface to the transcription collaborator that consumes finished
//! recordings.

use crate::recorder::NamedAudioArtifact;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{info, instrument};

/// Transcript returned when no transcription service is configured.
pub const CANNED_TRANSCRIPT: &str = "Patient presents with a three-day history of sore throat, \
mild fever, and fatigue. Denies cough or shortness of breath. No known drug allergies. Vital \
signs stable. Recommend supportive care, hydration, and acetaminophen as needed. Follow-up in \
48 hours.";

/// Text produced from a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionResult {
    /// Plain-text transcript.
    pub transcript: String,
    /// Wall-clock time spent transcribing.
    pub duration_ms: Option<u64>,
}

/// Turns a named audio file into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes `file`. Implementations fall back to a canned transcript
    /// rather than failing.
    async fn transcribe(&self, file: &NamedAudioArtifact) -> TranscriptionResult;
}

/// Offline stand-in that returns [`CANNED_TRANSCRIPT`] after a simulated
/// processing delay.
#[derive(Debug, Clone)]
pub struct CannedTranscriber {
    delay: Duration,
}

impl CannedTranscriber {
    /// Simulated processing time of the offline path.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

    /// Creates a transcriber that waits `delay` before answering.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for CannedTranscriber {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl Transcriber for CannedTranscriber {
    #[instrument(skip(self, file), fields(name = %file.name, bytes = file.bytes.len()))]
    async fn transcribe(&self, file: &NamedAudioArtifact) -> TranscriptionResult {
        let start = Instant::now();
        tokio::time::sleep(self.delay).await;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).ok();
        info!(duration_ms = ?duration_ms, "Canned transcript returned");

        TranscriptionResult {
            transcript: CANNED_TRANSCRIPT.to_string(),
            duration_ms,
        }
    }
}
