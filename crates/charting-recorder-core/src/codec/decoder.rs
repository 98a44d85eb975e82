use crate::{TranscodeError, codec::dequantize, codec::l16, codec::wav::WAV_MIME_TYPE};

use std::{io::Cursor, panic::Location, sync::Arc};

use async_trait::async_trait;
use error_location::ErrorLocation;
use hound::{SampleFormat, WavReader};
use tracing::{debug, instrument};

/// Linear PCM: one float buffer per channel, samples in [-1, 1].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedAudio {
    /// Per-channel sample buffers.
    pub channels: Vec<Vec<f32>>,
    /// Frames per second reported by the decoder.
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames in the longest channel.
    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Decodes an encoded audio blob into linear PCM.
#[async_trait]
pub trait PcmDecoder: Send + Sync {
    /// Decodes `encoded`, which was captured as `mime_type`.
    ///
    /// Implementations must not block the runtime; CPU-bound decoding
    /// belongs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns a [`TranscodeError`] when the format is unsupported or the
    /// payload is malformed.
    async fn decode(
        &self,
        encoded: Arc<[u8]>,
        mime_type: &str,
    ) -> Result<DecodedAudio, TranscodeError>;
}

/// Decoder for the formats this crate can produce: `audio/L16` chunks and
/// WAV files.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardDecoder;

impl StandardDecoder {
    #[track_caller]
    fn decode_blocking(encoded: &[u8], mime_type: &str) -> Result<DecodedAudio, TranscodeError> {
        let base = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if l16::is_l16(mime_type) {
            Self::decode_l16(encoded, mime_type)
        } else if base == WAV_MIME_TYPE || base == "audio/wave" || base == "audio/x-wav" {
            Self::decode_wav(encoded)
        } else {
            Err(TranscodeError::UnsupportedFormat {
                mime_type: mime_type.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }

    #[track_caller]
    fn decode_l16(encoded: &[u8], mime_type: &str) -> Result<DecodedAudio, TranscodeError> {
        let (sample_rate, channels) =
            l16::parse_params(mime_type).ok_or_else(|| TranscodeError::DecodeFailed {
                reason: format!("missing or invalid L16 parameters in {mime_type:?}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let channels =
            l16::decode(encoded, channels).ok_or_else(|| TranscodeError::DecodeFailed {
                reason: format!("{} bytes is not a whole number of frames", encoded.len()),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(DecodedAudio {
            channels,
            sample_rate,
        })
    }

    #[track_caller]
    fn decode_wav(encoded: &[u8]) -> Result<DecodedAudio, TranscodeError> {
        let reader =
            WavReader::new(Cursor::new(encoded)).map_err(|e| TranscodeError::DecodeFailed {
                reason: format!("Failed to read WAV header: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let spec = reader.spec();
        let channel_count = usize::from(spec.channels);
        if channel_count == 0 {
            return Err(TranscodeError::DecodeFailed {
                reason: "WAV declares zero channels".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<f32>, _>>(),
            SampleFormat::Int if spec.bits_per_sample == 16 => reader
                .into_samples::<i16>()
                .map(|s| s.map(dequantize))
                .collect::<Result<Vec<f32>, _>>(),
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<f32>, _>>()
            }
        }
        .map_err(|e| TranscodeError::DecodeFailed {
            reason: format!("Failed to read WAV samples: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for (i, sample) in interleaved.into_iter().enumerate() {
            if let Some(channel) = channels.get_mut(i % channel_count) {
                channel.push(sample);
            }
        }

        Ok(DecodedAudio {
            channels,
            sample_rate: spec.sample_rate,
        })
    }
}

#[async_trait]
impl PcmDecoder for StandardDecoder {
    #[instrument(skip(self, encoded), fields(bytes = encoded.len()))]
    async fn decode(
        &self,
        encoded: Arc<[u8]>,
        mime_type: &str,
    ) -> Result<DecodedAudio, TranscodeError> {
        let mime_type = mime_type.to_string();

        let decoded =
            tokio::task::spawn_blocking(move || Self::decode_blocking(&encoded, &mime_type))
                .await
                .map_err(|e| TranscodeError::DecodeFailed {
                    reason: format!("Decode task panicked: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })??;

        debug!(
            channels = decoded.channel_count(),
            frames = decoded.frames(),
            sample_rate = decoded.sample_rate,
            "Decoded audio"
        );

        Ok(decoded)
    }
}
