mod artifact;
mod clock;
mod observer;
#[allow(clippy::module_inception)]
mod recorder;
mod state;

pub(crate) use clock::SessionClock;

#[cfg(test)]
pub(crate) use recorder::transcode;

pub use {
    artifact::{AudioArtifact, NamedAudioArtifact, ObjectUrlStore, PreviewHandle, PreviewStore},
    observer::{ChannelObserver, StateObserver},
    recorder::{
        AudioRecorder, Capabilities, DEFAULT_TICK_INTERVAL, DEFAULT_TIMESLICE, RecorderOptions,
    },
    state::{RecorderPhase, RecordingState},
};
