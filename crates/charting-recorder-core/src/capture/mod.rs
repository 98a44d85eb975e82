//! Capability interfaces between the recorder and the host audio platform.
//!
//! The recorder never touches a device directly: it asks a
//! [`MicrophoneSource`] for a [`MediaStream`], opens a [`ChunkRecorder`] on
//! that stream, and receives encoded chunks as [`RecorderEvent`]s.

pub(crate) mod cpal_source;

pub use cpal_source::{CpalChunkRecorder, CpalMicrophone, CpalStream};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Sample rate requested at capture.
pub const CAPTURE_SAMPLE_RATE: u32 = 44_100;

/// Encodings tried, in order, before falling back to the stream's default.
pub const PREFERRED_MIME_TYPES: &[&str] = &["audio/webm;codecs=opus", "audio/ogg;codecs=opus"];

/// Microphone configuration requested from the platform.
///
/// Only the default set is ever requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Ask the platform to cancel speaker echo.
    pub echo_cancellation: bool,
    /// Ask the platform to suppress background noise.
    pub noise_suppression: bool,
    /// Ask the platform to normalize input level.
    pub auto_gain_control: bool,
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            sample_rate: CAPTURE_SAMPLE_RATE,
        }
    }
}

/// Platform-level acquisition failure classes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquireError {
    /// Access to the input device was refused.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// No usable input device exists.
    #[error("no input device: {0}")]
    NotFound(String),
    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Events emitted by a [`ChunkRecorder`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// An encoded piece of the recording.
    Data(Vec<u8>),
    /// Capture has ended; no further data follows.
    Stopped,
    /// Capture hit a fault; the recording may continue or stop.
    Failed(String),
}

/// Sending half used by chunk recorders to deliver [`RecorderEvent`]s.
pub type ChunkSink = mpsc::UnboundedSender<RecorderEvent>;

/// Grants access to a live microphone stream.
#[async_trait]
pub trait MicrophoneSource: Send + Sync {
    /// Acquires an input stream honouring `constraints` as far as the
    /// platform allows.
    async fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquireError>;
}

/// A live input stream and its tracks.
pub trait MediaStream: Send {
    /// Whether a chunk recorder can encode as `mime_type`.
    fn supports_mime_type(&self, mime_type: &str) -> bool;

    /// Encoding used when no preferred type is supported.
    fn default_mime_type(&self) -> String;

    /// Creates a chunk recorder on this stream that reports into `sink`.
    fn open_recorder(
        &mut self,
        mime_type: &str,
        sink: ChunkSink,
    ) -> Result<Box<dyn ChunkRecorder>, AcquireError>;

    /// Stops every track. Idempotent.
    fn stop_tracks(&mut self);

    /// Number of tracks still delivering audio.
    fn live_tracks(&self) -> usize;
}

/// Chunked recording primitive.
///
/// After [`ChunkRecorder::stop`] the recorder must deliver any buffered data
/// followed by exactly one [`RecorderEvent::Stopped`].
pub trait ChunkRecorder: Send {
    /// Encoding of emitted chunks.
    fn mime_type(&self) -> &str;

    /// Begins capture, emitting a chunk at least every `timeslice`.
    fn start(&mut self, timeslice: Duration) -> Result<(), AcquireError>;

    /// Suspends capture without ending it.
    fn pause(&mut self);

    /// Continues a paused capture.
    fn resume(&mut self);

    /// Ends capture.
    fn stop(&mut self);
}

/// Resolves the chunk encoding for a session: the first supported entry of
/// `preferred`, or the stream default.
pub fn select_mime_type<S: AsRef<str>>(preferred: &[S], stream: &dyn MediaStream) -> String {
    preferred
        .iter()
        .map(AsRef::as_ref)
        .find(|mime| stream.supports_mime_type(mime))
        .map(str::to_string)
        .unwrap_or_else(|| stream.default_mime_type())
}
