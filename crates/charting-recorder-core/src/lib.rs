//! Charting Recorder Core Library
//!
//! Microphone recording with pause/resume, active-time accounting and
//! finalization into a canonical 16-bit PCM WAV artifact.
//!
//! # Example
//!
//! ```no_run
//! use charting_recorder_core::{AudioRecorder, Capabilities, CoreResult, RecorderOptions};
//!
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let recorder = AudioRecorder::new(
//!         Capabilities::system(None),
//!         RecorderOptions::default(),
//!         Some(Box::new(|state: &charting_recorder_core::RecordingState| {
//!             println!("{}s recorded", state.duration_seconds);
//!         })),
//!     );
//!
//!     recorder.start_recording().await?;
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!     recorder.stop_recording();
//!
//!     let mut updates = recorder.subscribe();
//!     let _ = updates.wait_for(|s| s.audio_artifact.is_some()).await;
//!
//!     if let Some(file) = recorder.get_audio_file("recording.wav") {
//!         println!("{} bytes of {}", file.bytes.len(), file.mime_type);
//!     }
//!
//!     recorder.dispose();
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod codec;
mod error;
mod format;
mod recorder;
pub mod transcription;

pub use {
    error::{
        DEVICE_NOT_FOUND_MESSAGE, PERMISSION_DENIED_MESSAGE, RecorderError, Result as CoreResult,
        TranscodeError,
    },
    format::format_duration,
    recorder::{
        AudioArtifact, AudioRecorder, Capabilities, ChannelObserver, DEFAULT_TICK_INTERVAL,
        DEFAULT_TIMESLICE, NamedAudioArtifact, ObjectUrlStore, PreviewHandle, PreviewStore,
        RecorderOptions, RecorderPhase, RecordingState, StateObserver,
    },
};
