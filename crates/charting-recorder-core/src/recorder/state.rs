use crate::recorder::{AudioArtifact, PreviewHandle};

/// Snapshot of a recording session, handed to observers after every
/// transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingState {
    /// True from a successful start until stop or cancel.
    pub is_recording: bool,
    /// True only while paused.
    pub is_paused: bool,
    /// Whole seconds of active, non-paused recording.
    pub duration_seconds: u64,
    /// Finalized audio, present once a stop has completed.
    pub audio_artifact: Option<AudioArtifact>,
    /// Revocable playback reference for `audio_artifact`.
    pub audio_preview: Option<PreviewHandle>,
    /// Last recording failure, in user-readable form.
    pub error: Option<String>,
}

/// Lifecycle phase of an [`AudioRecorder`](crate::AudioRecorder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderPhase {
    /// No session yet, or the last start attempt failed.
    Idle,
    /// Waiting for the microphone.
    Starting,
    /// Capturing.
    Recording,
    /// Capture suspended.
    Paused,
    /// Capture ended; chunks are being transcoded.
    Finalizing,
    /// Finalized artifact available.
    Stopped,
    /// Session discarded.
    Cancelled,
    /// Resources released; the recorder accepts no further sessions.
    Disposed,
}

impl RecorderPhase {
    /// Recording or paused.
    pub fn is_active(self) -> bool {
        matches!(self, RecorderPhase::Recording | RecorderPhase::Paused)
    }
}
