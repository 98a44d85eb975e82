use crate::{
    CoreResult, RecorderError, TranscodeError,
    capture::{
        AcquireError, CaptureConstraints, ChunkRecorder, CpalMicrophone, MediaStream,
        MicrophoneSource, PREFERRED_MIME_TYPES, RecorderEvent, select_mime_type,
    },
    codec::{DecodedAudio, PcmDecoder, StandardDecoder, WAV_MIME_TYPE, wav},
    recorder::{
        AudioArtifact, NamedAudioArtifact, ObjectUrlStore, PreviewStore, RecorderPhase,
        RecordingState, SessionClock, StateObserver,
    },
};

use std::{
    panic::Location,
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::{
    runtime::Handle,
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, instrument, warn};

/// Default interval between emitted chunks.
pub const DEFAULT_TIMESLICE: Duration = Duration::from_secs(1);

/// Default interval between duration updates.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Platform services the recorder depends on.
#[derive(Clone)]
pub struct Capabilities {
    /// Grants microphone streams.
    pub microphone: Arc<dyn MicrophoneSource>,
    /// Turns captured chunks into PCM.
    pub decoder: Arc<dyn PcmDecoder>,
    /// Issues playback handles for finalized artifacts.
    pub previews: Arc<dyn PreviewStore>,
}

impl Capabilities {
    /// cpal capture, the standard decoder and an in-process preview store.
    ///
    /// `selected_device` names an input device; `None` uses the default.
    pub fn system(selected_device: Option<&str>) -> Self {
        let microphone = match selected_device {
            Some(name) => CpalMicrophone::with_device(name),
            None => CpalMicrophone::new(),
        };

        Self {
            microphone: Arc::new(microphone),
            decoder: Arc::new(StandardDecoder),
            previews: Arc::new(ObjectUrlStore::new()),
        }
    }
}

/// Tunables for a recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    /// How often the chunk recorder emits data.
    pub timeslice: Duration,
    /// How often `duration_seconds` is recomputed while recording.
    pub tick_interval: Duration,
    /// Chunk encodings to try, best first.
    pub preferred_mime_types: Vec<String>,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            timeslice: DEFAULT_TIMESLICE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            preferred_mime_types: PREFERRED_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Session bookkeeping guarded by the state lock.
struct Inner {
    state: RecordingState,
    phase: RecorderPhase,
    /// Bumped whenever a session is superseded, cancelled or disposed.
    /// Async work for an older generation discards its results.
    generation: u64,
    stream: Option<Box<dyn MediaStream>>,
    chunk_recorder: Option<Box<dyn ChunkRecorder>>,
    mime_type: Option<String>,
    chunks: Vec<Vec<u8>>,
    clock: Option<SessionClock>,
    ticker: Option<JoinHandle<()>>,
    collector: Option<JoinHandle<()>>,
}

struct Shared {
    capabilities: Capabilities,
    options: RecorderOptions,
    observer: Option<Box<dyn StateObserver>>,
    watch_tx: watch::Sender<RecordingState>,
    inner: Mutex<Inner>,
}

/// Records one microphone session at a time and produces a WAV artifact.
///
/// Drive it with `start_recording`, then any number of
/// `pause_recording`/`resume_recording`, then `stop_recording` or
/// `cancel_recording`. Finalization runs on the tokio runtime after stop;
/// the artifact arrives in a later snapshot.
///
/// Dropping the recorder disposes it.
pub struct AudioRecorder {
    shared: Arc<Shared>,
}

impl AudioRecorder {
    /// Creates an idle recorder.
    ///
    /// `observer` receives a snapshot after every transition.
    pub fn new(
        capabilities: Capabilities,
        options: RecorderOptions,
        observer: Option<Box<dyn StateObserver>>,
    ) -> Self {
        let (watch_tx, _) = watch::channel(RecordingState::default());

        Self {
            shared: Arc::new(Shared {
                capabilities,
                options,
                observer,
                watch_tx,
                inner: Mutex::new(Inner {
                    state: RecordingState::default(),
                    phase: RecorderPhase::Idle,
                    generation: 0,
                    stream: None,
                    chunk_recorder: None,
                    mime_type: None,
                    chunks: Vec::new(),
                    clock: None,
                    ticker: None,
                    collector: None,
                }),
            }),
        }
    }

    /// Acquires the microphone and begins capturing.
    ///
    /// Starting again after a stop or cancel begins a new session and
    /// supersedes any finalization still in flight.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::PermissionDenied`],
    /// [`RecorderError::DeviceNotFound`] or
    /// [`RecorderError::AcquisitionFailed`] when capture cannot start; the
    /// same failure is recorded in `RecordingState::error` and published.
    /// Returns [`RecorderError::AlreadyRecording`] or
    /// [`RecorderError::Disposed`] without touching state when the recorder
    /// cannot accept a new session.
    #[instrument(skip(self))]
    pub async fn start_recording(&self) -> CoreResult<()> {
        let shared = &self.shared;

        let (generation, prior) = {
            let mut inner = shared.lock();
            match inner.phase {
                RecorderPhase::Disposed => {
                    return Err(RecorderError::Disposed {
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                RecorderPhase::Starting | RecorderPhase::Recording | RecorderPhase::Paused => {
                    return Err(RecorderError::AlreadyRecording {
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                _ => {}
            }

            let mut prior = inner.phase;
            inner.generation += 1;
            if prior == RecorderPhase::Finalizing {
                // The superseded finalization will never complete.
                shared.release_capture(&mut inner);
                inner.chunks.clear();
                prior = RecorderPhase::Idle;
            }
            inner.phase = RecorderPhase::Starting;
            (inner.generation, prior)
        };

        let Ok(runtime) = Handle::try_current() else {
            return Err(shared.fail_start(
                generation,
                prior,
                RecorderError::AcquisitionFailed {
                    reason: "no async runtime available".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                },
            ));
        };

        let acquired = shared
            .capabilities
            .microphone
            .acquire(&CaptureConstraints::default())
            .await;

        let mut stream = match acquired {
            Ok(stream) => stream,
            Err(e) => return Err(shared.fail_start(generation, prior, acquisition_error(e))),
        };

        let mut inner = shared.lock();

        if inner.phase != RecorderPhase::Starting || inner.generation != generation {
            stream.stop_tracks();
            info!(session = generation, "Recorder disposed while acquiring microphone");
            return Err(RecorderError::Disposed {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mime_type = select_mime_type(&shared.options.preferred_mime_types, stream.as_ref());
        let (sink, events) = mpsc::unbounded_channel();

        let mut chunk_recorder = match stream.open_recorder(&mime_type, sink) {
            Ok(recorder) => recorder,
            Err(e) => {
                stream.stop_tracks();
                return Err(shared.fail_start_locked(&mut inner, prior, acquisition_error(e)));
            }
        };

        if let Err(e) = chunk_recorder.start(shared.options.timeslice) {
            chunk_recorder.stop();
            stream.stop_tracks();
            return Err(shared.fail_start_locked(&mut inner, prior, acquisition_error(e)));
        }

        // The previous session's artifact is replaced by this one.
        if let Some(handle) = inner.state.audio_preview.take() {
            shared.capabilities.previews.revoke(&handle);
        }

        let mime_type = chunk_recorder.mime_type().to_string();

        inner.chunks.clear();
        inner.stream = Some(stream);
        inner.chunk_recorder = Some(chunk_recorder);
        inner.mime_type = Some(mime_type.clone());
        inner.clock = Some(SessionClock::start(Instant::now()));
        inner.phase = RecorderPhase::Recording;
        inner.state = RecordingState {
            is_recording: true,
            ..RecordingState::default()
        };
        inner.collector = Some(runtime.spawn(collect_chunks(
            Arc::downgrade(shared),
            generation,
            events,
        )));
        inner.ticker = spawn_ticker(shared, generation);

        info!(session = generation, mime_type = %mime_type, "Recording started");
        shared.publish(&inner);

        Ok(())
    }

    /// Pauses capture. No-op unless recording and unpaused.
    #[instrument(skip(self))]
    pub fn pause_recording(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();

        if inner.phase != RecorderPhase::Recording {
            return;
        }

        let now = Instant::now();
        shared.refresh_duration(&mut inner, now);

        if let Some(recorder) = inner.chunk_recorder.as_mut() {
            recorder.pause();
        }
        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
        }
        if let Some(clock) = inner.clock.as_mut() {
            clock.pause(now);
        }

        inner.phase = RecorderPhase::Paused;
        inner.state.is_paused = true;

        info!(
            session = inner.generation,
            duration_seconds = inner.state.duration_seconds,
            "Recording paused"
        );
        shared.publish(&inner);
    }

    /// Resumes a paused capture. No-op unless paused.
    #[instrument(skip(self))]
    pub fn resume_recording(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();

        if inner.phase != RecorderPhase::Paused {
            return;
        }

        if let Some(recorder) = inner.chunk_recorder.as_mut() {
            recorder.resume();
        }
        if let Some(clock) = inner.clock.as_mut() {
            clock.resume(Instant::now());
        }

        inner.ticker = spawn_ticker(shared, inner.generation);
        inner.phase = RecorderPhase::Recording;
        inner.state.is_paused = false;

        info!(session = inner.generation, "Recording resumed");
        shared.publish(&inner);
    }

    /// Ends capture and starts finalization. No-op unless recording or
    /// paused.
    #[instrument(skip(self))]
    pub fn stop_recording(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();

        if !inner.phase.is_active() {
            return;
        }

        shared.end_capture(&mut inner, Instant::now());

        info!(
            session = inner.generation,
            duration_seconds = inner.state.duration_seconds,
            "Recording stopped"
        );
    }

    /// Ends capture and discards everything recorded.
    ///
    /// Takes precedence over a finalization already in flight: its result
    /// is never applied. No-op when idle, starting, cancelled or disposed.
    #[instrument(skip(self))]
    pub fn cancel_recording(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();

        if inner.phase.is_active() {
            shared.end_capture(&mut inner, Instant::now());
        }

        if !matches!(
            inner.phase,
            RecorderPhase::Finalizing | RecorderPhase::Stopped
        ) {
            return;
        }

        inner.generation += 1;
        inner.chunks.clear();
        shared.release_capture(&mut inner);
        shared.revoke_preview(&mut inner);

        inner.clock = None;
        inner.mime_type = None;
        inner.state.audio_artifact = None;
        inner.state.duration_seconds = 0;
        inner.phase = RecorderPhase::Cancelled;

        info!(session = inner.generation, "Recording cancelled");
        shared.publish(&inner);
    }

    /// Current state, as an independent copy.
    pub fn get_state(&self) -> RecordingState {
        self.shared.lock().state.clone()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RecorderPhase {
        self.shared.lock().phase
    }

    /// The finalized artifact wrapped as a WAV file named `name`, or `None`
    /// before finalization completes.
    pub fn get_audio_file(&self, name: &str) -> Option<NamedAudioArtifact> {
        self.shared
            .lock()
            .state
            .audio_artifact
            .as_ref()
            .map(|artifact| NamedAudioArtifact::from_artifact(name, artifact))
    }

    /// Latest-value view of the state, updated on every transition.
    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.shared.watch_tx.subscribe()
    }

    /// Releases the stream, timers and preview handle. Idempotent and safe
    /// from any state.
    ///
    /// An active capture is stopped first, which publishes the
    /// `is_recording=false` snapshot; nothing is published after that.
    #[instrument(skip(self))]
    pub fn dispose(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();

        if inner.phase == RecorderPhase::Disposed {
            return;
        }

        if inner.phase.is_active() {
            shared.end_capture(&mut inner, Instant::now());
        }

        inner.generation += 1;
        inner.chunks.clear();
        shared.release_capture(&mut inner);
        shared.revoke_preview(&mut inner);
        inner.phase = RecorderPhase::Disposed;

        info!("Recorder disposed");
    }
}

impl Drop for AudioRecorder {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned mutex means a previous holder panicked; the
        // bookkeeping is still usable for teardown.
        self.inner.lock().unwrap_or_else(|e| {
            error!("Recorder state lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    /// Notifies observers. Callers hold the lock, which orders snapshots.
    fn publish(&self, inner: &Inner) {
        let snapshot = inner.state.clone();
        if let Some(observer) = self.observer.as_ref() {
            observer.on_state_change(&snapshot);
        }
        self.watch_tx.send_replace(snapshot);
    }

    fn fail_start(&self, generation: u64, prior: RecorderPhase, err: RecorderError) -> RecorderError {
        let mut inner = self.lock();
        if inner.phase != RecorderPhase::Starting || inner.generation != generation {
            return err;
        }
        self.fail_start_locked(&mut inner, prior, err)
    }

    fn fail_start_locked(
        &self,
        inner: &mut Inner,
        prior: RecorderPhase,
        err: RecorderError,
    ) -> RecorderError {
        inner.phase = prior;
        inner.state.error = Some(err.user_message());

        error!(session = inner.generation, error = %err, "Failed to start recording");
        self.publish(inner);

        err
    }

    /// Stops the chunk recorder and the ticker; the session moves to
    /// finalizing and `is_recording=false` is published.
    fn end_capture(&self, inner: &mut Inner, now: Instant) {
        if inner.phase == RecorderPhase::Recording {
            self.refresh_duration(inner, now);
        }
        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
        }
        if let Some(mut recorder) = inner.chunk_recorder.take() {
            recorder.stop();
        }

        inner.phase = RecorderPhase::Finalizing;
        inner.state.is_recording = false;
        inner.state.is_paused = false;

        self.publish(inner);
    }

    /// Releases the stream tracks and every task of the current session.
    fn release_capture(&self, inner: &mut Inner) {
        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
        }
        if let Some(collector) = inner.collector.take() {
            collector.abort();
        }
        if let Some(mut recorder) = inner.chunk_recorder.take() {
            recorder.stop();
        }
        if let Some(mut stream) = inner.stream.take() {
            stream.stop_tracks();
        }
    }

    fn revoke_preview(&self, inner: &mut Inner) {
        if let Some(handle) = inner.state.audio_preview.take() {
            self.capabilities.previews.revoke(&handle);
        }
    }

    fn refresh_duration(&self, inner: &mut Inner, now: Instant) {
        let Some(clock) = inner.clock else {
            return;
        };

        let seconds = clock.elapsed_seconds(now);
        if seconds != inner.state.duration_seconds {
            inner.state.duration_seconds = seconds;
            self.publish(inner);
        }
    }

    /// One ticker step. Returns false once the ticker should exit.
    fn tick(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation || inner.phase != RecorderPhase::Recording {
            return false;
        }
        self.refresh_duration(&mut inner, Instant::now());
        true
    }

    fn push_chunk(&self, generation: u64, chunk: Vec<u8>) {
        let mut inner = self.lock();
        if inner.generation != generation || chunk.is_empty() {
            return;
        }
        if !matches!(
            inner.phase,
            RecorderPhase::Recording | RecorderPhase::Paused | RecorderPhase::Finalizing
        ) {
            return;
        }

        debug!(session = generation, bytes = chunk.len(), "Chunk buffered");
        inner.chunks.push(chunk);
    }

    async fn finalize(&self, generation: u64) {
        let (encoded, mime_type) = {
            let mut inner = self.lock();
            if inner.generation != generation {
                debug!(session = generation, "Discarding chunks of a superseded session");
                return;
            }

            // Capture ended without a stop call, e.g. the device went away.
            if inner.phase.is_active() {
                warn!(session = generation, "Capture ended unexpectedly");
                self.end_capture(&mut inner, Instant::now());
            }

            if inner.phase != RecorderPhase::Finalizing {
                return;
            }

            if let Some(mut stream) = inner.stream.take() {
                stream.stop_tracks();
            }

            let encoded: Arc<[u8]> = std::mem::take(&mut inner.chunks).concat().into();
            let mime_type = inner.mime_type.clone().unwrap_or_default();
            (encoded, mime_type)
        };

        let artifact = transcode(self.capabilities.decoder.as_ref(), encoded, &mime_type).await;

        let mut inner = self.lock();
        if inner.generation != generation || inner.phase != RecorderPhase::Finalizing {
            debug!(session = generation, "Discarding finalized audio of a cancelled session");
            return;
        }

        self.revoke_preview(&mut inner);
        let preview = self.capabilities.previews.create(&artifact);

        info!(
            session = generation,
            bytes = artifact.len(),
            mime_type = %artifact.mime_type(),
            "Recording finalized"
        );

        inner.state.audio_artifact = Some(artifact);
        inner.state.audio_preview = Some(preview);
        inner.phase = RecorderPhase::Stopped;
        inner.collector = None;

        self.publish(&inner);
    }
}

/// Buffers chunks in arrival order and finalizes once capture ends.
async fn collect_chunks(
    shared: Weak<Shared>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<RecorderEvent>,
) {
    loop {
        let event = events.recv().await;
        let Some(shared) = shared.upgrade() else {
            return;
        };

        match event {
            Some(RecorderEvent::Data(chunk)) => shared.push_chunk(generation, chunk),
            Some(RecorderEvent::Failed(reason)) => {
                warn!(session = generation, reason = %reason, "Capture fault reported");
            }
            // A closed channel means the recorder is gone; treat it as stopped.
            Some(RecorderEvent::Stopped) | None => {
                shared.finalize(generation).await;
                return;
            }
        }
    }
}

fn spawn_ticker(shared: &Arc<Shared>, generation: u64) -> Option<JoinHandle<()>> {
    let runtime = match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!(error = %e, "No async runtime, duration will not update");
            return None;
        }
    };

    let weak = Arc::downgrade(shared);
    let period = shared.options.tick_interval;

    Some(runtime.spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(shared) = weak.upgrade() else {
                break;
            };
            if !shared.tick(generation) {
                break;
            }
        }
    }))
}

/// Decodes `encoded` and re-encodes it as WAV, falling back to the original
/// blob on any failure.
///
/// Decoding and encoding run on the blocking pool; the caller applies the
/// generation guard to the result.
pub(crate) async fn transcode(
    decoder: &dyn PcmDecoder,
    encoded: Arc<[u8]>,
    mime_type: &str,
) -> AudioArtifact {
    let converted = match decoder.decode(Arc::clone(&encoded), mime_type).await {
        Ok(pcm) => encode_wav(pcm).await,
        Err(e) => Err(e),
    };

    match converted {
        Ok(wav_bytes) => AudioArtifact::new(wav_bytes, WAV_MIME_TYPE),
        Err(e) => {
            warn!(
                error = %e,
                mime_type = %mime_type,
                "Failed to convert to WAV, using original format"
            );
            AudioArtifact::new(encoded, mime_type)
        }
    }
}

async fn encode_wav(pcm: DecodedAudio) -> Result<Vec<u8>, TranscodeError> {
    tokio::task::spawn_blocking(move || wav::encode(&pcm))
        .await
        .map_err(|e| TranscodeError::EncodeFailed {
            reason: format!("Encode task panicked: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?
}

#[track_caller]
fn acquisition_error(error: AcquireError) -> RecorderError {
    let location = ErrorLocation::from(Location::caller());
    match error {
        AcquireError::PermissionDenied(reason) => RecorderError::PermissionDenied { reason, location },
        AcquireError::NotFound(reason) => RecorderError::DeviceNotFound { reason, location },
        AcquireError::Other(reason) => RecorderError::AcquisitionFailed { reason, location },
    }
}
