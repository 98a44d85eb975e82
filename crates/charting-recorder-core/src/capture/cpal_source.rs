use crate::{
    capture::{
        AcquireError, CaptureConstraints, ChunkRecorder, ChunkSink, MediaStream, MicrophoneSource,
        RecorderEvent,
    },
    codec::l16,
};

use std::{
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cpal::{
    BuildStreamError, Device, SampleFormat, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, error, info, instrument, warn};

/// Samples written by the audio callback and drained by the chunk pump.
#[derive(Default)]
struct TapBuffer {
    samples: Vec<f32>,
    /// Set once `Stopped` has been sent; later drains emit nothing.
    closed: bool,
}

#[derive(Default)]
pub(crate) struct SampleTap {
    buffer: Mutex<TapBuffer>,
    /// Gates the audio callback: false while paused or not yet started.
    armed: AtomicBool,
    /// Set before the stream is dropped so no late callback writes.
    shutdown: AtomicBool,
}

impl SampleTap {
    fn lock(&self) -> MutexGuard<'_, TapBuffer> {
        // A poisoned mutex means a previous holder panicked, but the
        // samples are still valid and usable.
        self.buffer.lock().unwrap_or_else(|e| {
            error!("Sample buffer lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    /// Buffers samples from the audio callback unless paused or shut down.
    pub(crate) fn push(&self, data: &[f32]) {
        if self.shutdown.load(Ordering::Acquire) || !self.armed.load(Ordering::Acquire) {
            return;
        }
        self.lock().samples.extend_from_slice(data);
    }

    /// Drains buffered samples into one L16 chunk and sends it.
    ///
    /// The send happens under the lock so chunks leave in drain order.
    /// Returns false once the sink is gone or the tap is closed.
    pub(crate) fn flush(&self, sink: &ChunkSink) -> bool {
        let mut buf = self.lock();
        if buf.closed {
            return false;
        }
        if buf.samples.is_empty() {
            return !sink.is_closed();
        }

        let mut chunk = Vec::new();
        l16::encode_into(&buf.samples, &mut chunk);
        buf.samples.clear();

        debug!(bytes = chunk.len(), "Chunk captured");
        sink.send(RecorderEvent::Data(chunk)).is_ok()
    }
}

/// Input devices reached through cpal's default host.
#[derive(Debug, Default, Clone)]
pub struct CpalMicrophone {
    selected_device: Option<String>,
}

impl CpalMicrophone {
    /// Uses the host's default input device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the input device with this name, when present.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            selected_device: Some(name.into()),
        }
    }
}

#[async_trait]
impl MicrophoneSource for CpalMicrophone {
    #[instrument(skip(self))]
    async fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquireError> {
        let stream = CpalStream::open(self.selected_device.as_deref(), constraints)?;
        Ok(Box::new(stream))
    }
}

/// A playing cpal input stream.
pub struct CpalStream {
    stream: Option<Stream>,
    tap: Arc<SampleTap>,
    sample_rate: u32,
    channels: u16,
}

impl CpalStream {
    fn open(
        selected_device: Option<&str>,
        constraints: &CaptureConstraints,
    ) -> Result<Self, AcquireError> {
        let host = cpal::default_host();

        let device = match selected_device {
            Some(name) => find_input_device(&host, name)?,
            None => host
                .default_input_device()
                .ok_or_else(|| AcquireError::NotFound("no default input device".to_string()))?,
        };

        let config = pick_config(&device, constraints.sample_rate)?;

        if constraints.echo_cancellation
            || constraints.noise_suppression
            || constraints.auto_gain_control
        {
            debug!(
                echo_cancellation = constraints.echo_cancellation,
                noise_suppression = constraints.noise_suppression,
                auto_gain_control = constraints.auto_gain_control,
                "Input processing constraints are advisory on this host"
            );
        }

        let tap = Arc::new(SampleTap::default());
        let callback_tap = Arc::clone(&tap);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| callback_tap.push(data),
                |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(classify_build_error)?;

        stream
            .play()
            .map_err(|e| classify_message(format!("Failed to start stream: {}", e)))?;

        info!(
            device_id = ?device.id(),
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Microphone stream acquired"
        );

        Ok(Self {
            stream: Some(stream),
            tap,
            sample_rate: config.sample_rate,
            channels: config.channels,
        })
    }
}

impl MediaStream for CpalStream {
    fn supports_mime_type(&self, mime_type: &str) -> bool {
        if !l16::is_l16(mime_type) {
            return false;
        }
        match l16::parse_params(mime_type) {
            Some((rate, channels)) => rate == self.sample_rate && channels == self.channels,
            // Bare "audio/L16" lets the stream pick its own parameters.
            None => !mime_type.contains('='),
        }
    }

    fn default_mime_type(&self) -> String {
        l16::mime_type(self.sample_rate, self.channels)
    }

    fn open_recorder(
        &mut self,
        mime_type: &str,
        sink: ChunkSink,
    ) -> Result<Box<dyn ChunkRecorder>, AcquireError> {
        if self.stream.is_none() {
            return Err(AcquireError::Other("stream tracks have ended".to_string()));
        }
        if !self.supports_mime_type(mime_type) {
            return Err(AcquireError::Other(format!(
                "unsupported recording type {mime_type}"
            )));
        }

        Ok(Box::new(CpalChunkRecorder::new(
            Arc::clone(&self.tap),
            sink,
            self.default_mime_type(),
        )))
    }

    fn stop_tracks(&mut self) {
        self.tap.armed.store(false, Ordering::Release);
        // Signal the callback before dropping the stream so no in-flight
        // callback writes after this point.
        self.tap.shutdown.store(true, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Microphone stream released");
        }
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.stream.is_some())
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

/// Chunk recorder over a [`CpalStream`], emitting `audio/L16` chunks.
pub struct CpalChunkRecorder {
    tap: Arc<SampleTap>,
    sink: ChunkSink,
    mime_type: String,
    pump: Option<JoinHandle<()>>,
    stopped: bool,
}

impl CpalChunkRecorder {
    pub(crate) fn new(tap: Arc<SampleTap>, sink: ChunkSink, mime_type: String) -> Self {
        Self {
            tap,
            sink,
            mime_type,
            pump: None,
            stopped: false,
        }
    }
}

impl ChunkRecorder for CpalChunkRecorder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[instrument(skip(self))]
    fn start(&mut self, timeslice: Duration) -> Result<(), AcquireError> {
        let runtime = Handle::try_current()
            .map_err(|e| AcquireError::Other(format!("No async runtime: {}", e)))?;

        {
            let mut buf = self.tap.lock();
            buf.samples.clear();
            buf.closed = false;
        }
        self.tap.armed.store(true, Ordering::Release);

        let tap = Arc::clone(&self.tap);
        let sink = self.sink.clone();
        self.pump = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(timeslice);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !tap.flush(&sink) {
                    break;
                }
            }
        }));

        info!(mime_type = %self.mime_type, "Chunk recording started");

        Ok(())
    }

    fn pause(&mut self) {
        self.tap.armed.store(false, Ordering::Release);
    }

    fn resume(&mut self) {
        if !self.stopped {
            self.tap.armed.store(true, Ordering::Release);
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.tap.armed.store(false, Ordering::Release);

        if let Some(pump) = self.pump.take() {
            pump.abort();
        }

        self.tap.flush(&self.sink);

        let mut buf = self.tap.lock();
        buf.closed = true;
        if self.sink.send(RecorderEvent::Stopped).is_err() {
            warn!("Chunk sink closed before stop was delivered");
        }
        drop(buf);

        info!("Chunk recording stopped");
    }
}

impl Drop for CpalChunkRecorder {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

fn find_input_device(host: &cpal::Host, name: &str) -> Result<Device, AcquireError> {
    let devices = host
        .input_devices()
        .map_err(|e| classify_message(format!("Failed to enumerate input devices: {}", e)))?;

    for device in devices {
        #[allow(deprecated)]
        let device_name = device.name().ok();
        if device_name.as_deref() == Some(name) {
            return Ok(device);
        }
    }

    Err(AcquireError::NotFound(format!("input device {name:?} not found")))
}

/// Prefers an f32 configuration at the requested rate, otherwise the device
/// default.
fn pick_config(device: &Device, sample_rate: u32) -> Result<StreamConfig, AcquireError> {
    let at_rate = device.supported_input_configs().ok().and_then(|mut ranges| {
        ranges
            .find(|range| {
                range.sample_format() == SampleFormat::F32
                    && range.min_sample_rate() <= sample_rate
                    && sample_rate <= range.max_sample_rate()
            })
            .map(|range| range.with_sample_rate(sample_rate))
    });

    let supported = match at_rate {
        Some(config) => config,
        None => {
            let fallback = device
                .default_input_config()
                .map_err(|e| classify_message(format!("Failed to get config: {}", e)))?;
            debug!(
                requested = sample_rate,
                actual = fallback.sample_rate(),
                "Requested sample rate unavailable, using device default"
            );
            fallback
        }
    };

    Ok(supported.into())
}

fn classify_build_error(error: BuildStreamError) -> AcquireError {
    if matches!(error, BuildStreamError::DeviceNotAvailable) {
        AcquireError::NotFound(error.to_string())
    } else {
        classify_message(format!("Failed to build stream: {}", error))
    }
}

/// Backends report refused permission as free text.
pub(crate) fn classify_message(message: String) -> AcquireError {
    let lower = message.to_ascii_lowercase();
    if ["permission", "denied", "not authorized", "not allowed"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        AcquireError::PermissionDenied(message)
    } else {
        AcquireError::Other(message)
    }
}
