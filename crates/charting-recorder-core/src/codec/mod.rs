//! PCM codecs used during finalization.
//!
//! Captured chunks are decoded into per-channel float buffers by a
//! [`PcmDecoder`] and written out as a canonical 16-bit PCM WAV.

mod decoder;
pub(crate) mod l16;
pub(crate) mod wav;

pub use {
    decoder::{DecodedAudio, PcmDecoder, StandardDecoder},
    wav::{WAV_HEADER_LEN, WAV_MIME_TYPE, WavHeader},
};

/// Quantizes a float sample to signed 16-bit PCM.
///
/// Clamps to [-1, 1], then scales negatives by 32768 and non-negatives by
/// 32767 so full positive scale cannot overflow.
pub(crate) fn quantize(sample: f32) -> i16 {
    let s = if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    };

    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Inverse of [`quantize`].
pub(crate) fn dequantize(sample: i16) -> f32 {
    if sample < 0 {
        f32::from(sample) / 32768.0
    } else {
        f32::from(sample) / 32767.0
    }
}
