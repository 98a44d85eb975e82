//! Canonical 16-bit PCM WAV writer.
//!
//! Produces the classic 44-byte `RIFF`/`WAVE` header (a 16-byte `fmt ` chunk
//! followed directly by `data`) and interleaved little-endian samples.

use crate::{TranscodeError, codec::DecodedAudio, codec::quantize};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::{debug, instrument};

/// MIME type of every WAV artifact the recorder produces.
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Size of the canonical header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;
const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_PCM: u16 = 1;

/// Header fields of a 16-bit PCM WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// Interleaved channel count.
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    /// Length of the `data` chunk payload in bytes.
    pub data_len: u32,
}

impl WavHeader {
    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }

    /// Bytes per interleaved frame.
    pub fn block_align(&self) -> u16 {
        self.channels * BYTES_PER_SAMPLE
    }

    /// Value of the RIFF size field: total file length minus 8.
    pub fn riff_len(&self) -> u32 {
        self.data_len + (WAV_HEADER_LEN as u32 - 8)
    }

    /// Serializes the header to exactly [`WAV_HEADER_LEN`] bytes.
    pub fn to_bytes(&self) -> [u8; WAV_HEADER_LEN] {
        let mut header = [0u8; WAV_HEADER_LEN];

        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.riff_len().to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
        header[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_len.to_le_bytes());

        header
    }

    /// Reads back a header written by [`WavHeader::to_bytes`].
    ///
    /// Returns `None` unless the bytes start with a canonical 16-bit PCM
    /// header.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..WAV_HEADER_LEN)?;

        let u16_at = |at: usize| -> Option<u16> {
            Some(u16::from_le_bytes(header.get(at..at + 2)?.try_into().ok()?))
        };
        let u32_at = |at: usize| -> Option<u32> {
            Some(u32::from_le_bytes(header.get(at..at + 4)?.try_into().ok()?))
        };

        let canonical = header.get(0..4) == Some(b"RIFF".as_slice())
            && header.get(8..16) == Some(b"WAVEfmt ".as_slice())
            && header.get(36..40) == Some(b"data".as_slice())
            && u32_at(16)? == FMT_CHUNK_LEN
            && u16_at(20)? == FORMAT_PCM
            && u16_at(34)? == BITS_PER_SAMPLE;

        if !canonical {
            return None;
        }

        Some(Self {
            channels: u16_at(22)?,
            sample_rate: u32_at(24)?,
            data_len: u32_at(40)?,
        })
    }
}

/// Encodes decoded PCM into a canonical WAV payload.
///
/// # Errors
///
/// Returns [`TranscodeError::EncodeFailed`] when there are no channels, the
/// channels differ in length, or the payload does not fit the 32-bit RIFF
/// size fields.
#[track_caller]
#[instrument(skip(audio), fields(channels = audio.channel_count(), frames = audio.frames()))]
pub fn encode(audio: &DecodedAudio) -> Result<Vec<u8>, TranscodeError> {
    let channels = u16::try_from(audio.channel_count())
        .ok()
        .filter(|&c| c > 0 && c <= u16::MAX / BYTES_PER_SAMPLE)
        .ok_or_else(|| TranscodeError::EncodeFailed {
            reason: format!("unsupported channel count {}", audio.channel_count()),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let frames = audio.frames();
    if audio.channels.iter().any(|c| c.len() != frames) {
        return Err(TranscodeError::EncodeFailed {
            reason: "channels have different lengths".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if audio.sample_rate == 0 {
        return Err(TranscodeError::EncodeFailed {
            reason: "sample rate is zero".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let data_len = frames
        .checked_mul(usize::from(channels) * usize::from(BYTES_PER_SAMPLE))
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| len.checked_add(WAV_HEADER_LEN as u32 - 8).is_some())
        .ok_or_else(|| TranscodeError::EncodeFailed {
            reason: format!("{frames} frames exceed the WAV size limit"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let header = WavHeader {
        channels,
        sample_rate: audio.sample_rate,
        data_len,
    };

    if header.sample_rate.checked_mul(u32::from(header.block_align())).is_none() {
        return Err(TranscodeError::EncodeFailed {
            reason: format!("sample rate {} overflows the byte rate", audio.sample_rate),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    out.extend_from_slice(&header.to_bytes());

    for frame in 0..frames {
        for channel in &audio.channels {
            let sample = channel.get(frame).copied().unwrap_or_default();
            out.extend_from_slice(&quantize(sample).to_le_bytes());
        }
    }

    debug!(
        bytes = out.len(),
        sample_rate = header.sample_rate,
        channels = header.channels,
        "Encoded WAV"
    );

    Ok(out)
}
