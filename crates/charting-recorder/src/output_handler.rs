//! Saved recordings and their transcription.
//!
//! Writes finalized WAV files into the output directory and hands them to
//! the transcription collaborator.

use crate::{AppError, AppResult, config::Config};

use std::{
    panic::Location,
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use charting_recorder_core::{
    NamedAudioArtifact,
    transcription::{CannedTranscriber, Transcriber, TranscriptionResult},
};
use error_location::ErrorLocation;
use tracing::{info, instrument};

/// Output handler for saving and transcribing recordings.
pub struct OutputHandler {
    directory: PathBuf,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl OutputHandler {
    /// Create an output handler from configuration.
    #[track_caller]
    #[instrument(skip(config))]
    pub fn new(config: &Config) -> AppResult<Self> {
        let directory = config.output_directory()?;

        let transcriber: Option<Arc<dyn Transcriber>> = config.transcription.enabled.then(|| {
            Arc::new(CannedTranscriber::new(Duration::from_millis(
                config.transcription.simulated_delay_ms,
            ))) as Arc<dyn Transcriber>
        });

        info!(directory = ?directory, transcription = transcriber.is_some(), "OutputHandler initialized");

        Ok(Self::with_directory(directory, transcriber))
    }

    /// Create an output handler writing into `directory`.
    pub fn with_directory(directory: PathBuf, transcriber: Option<Arc<dyn Transcriber>>) -> Self {
        Self {
            directory,
            transcriber,
        }
    }

    /// Write `file` atomically into the output directory.
    #[instrument(skip(self, file), fields(name = %file.name, bytes = file.bytes.len()))]
    pub async fn save(&self, file: NamedAudioArtifact) -> AppResult<PathBuf> {
        let directory = self.directory.clone();

        let path = tokio::task::spawn_blocking(move || file.write_to_dir(&directory))
            .await
            .map_err(|e| AppError::IoError {
                source: std::io::Error::other(format!("Write task panicked: {}", e)),
                location: ErrorLocation::from(Location::caller()),
            })??;

        info!(path = ?path, "Recording saved");

        Ok(path)
    }

    /// Transcribe `file`, or `None` when transcription is disabled.
    #[instrument(skip(self, file), fields(name = %file.name))]
    pub async fn transcribe(&self, file: &NamedAudioArtifact) -> Option<TranscriptionResult> {
        let transcriber = self.transcriber.as_ref()?;
        Some(transcriber.transcribe(file).await)
    }
}

/// Resolve a user-supplied file name, or a timestamped default.
///
/// Names must be plain file names; `.wav` is appended when missing.
#[track_caller]
pub(crate) fn file_name(requested: Option<&str>, now: SystemTime) -> AppResult<String> {
    let Some(requested) = requested else {
        let millis = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        return Ok(format!("recording_{millis}.wav"));
    };

    let requested = requested.trim();
    if requested.is_empty()
        || requested.starts_with('.')
        || requested.contains(['/', '\\'])
    {
        return Err(AppError::InvalidFileName {
            name: requested.to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if requested.to_ascii_lowercase().ends_with(".wav") {
        Ok(requested.to_string())
    } else {
        Ok(format!("{requested}.wav"))
    }
}
