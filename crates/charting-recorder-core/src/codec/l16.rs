//! Headerless `audio/L16` (RFC 2586): big-endian signed 16-bit PCM.
//!
//! This is the chunk encoding the cpal capture path emits. Chunks carry no
//! header, so concatenating them in arrival order yields one valid stream.

use crate::codec::{dequantize, quantize};

/// Base MIME type, without parameters.
pub(crate) const L16_MIME_TYPE: &str = "audio/L16";

/// Builds the full MIME type for a stream format.
pub(crate) fn mime_type(sample_rate: u32, channels: u16) -> String {
    format!("{L16_MIME_TYPE};rate={sample_rate};channels={channels}")
}

/// True when `mime` names L16, regardless of parameters.
pub(crate) fn is_l16(mime: &str) -> bool {
    mime.split(';')
        .next()
        .is_some_and(|base| base.trim().eq_ignore_ascii_case(L16_MIME_TYPE))
}

/// Extracts `(rate, channels)` from an L16 MIME type.
///
/// `channels` defaults to 1 as RFC 2586 specifies; `rate` is mandatory.
pub(crate) fn parse_params(mime: &str) -> Option<(u32, u16)> {
    if !is_l16(mime) {
        return None;
    }

    let mut rate = None;
    let mut channels = 1u16;

    for param in mime.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "rate" => rate = value.trim().parse().ok(),
            "channels" => channels = value.trim().parse().ok()?,
            _ => {}
        }
    }

    rate.filter(|&r| r > 0)
        .filter(|_| channels > 0)
        .map(|r| (r, channels))
}

/// Appends interleaved float samples to `out` as L16 bytes.
pub(crate) fn encode_into(samples: &[f32], out: &mut Vec<u8>) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        out.extend_from_slice(&quantize(sample).to_be_bytes());
    }
}

/// Splits interleaved L16 bytes into one float buffer per channel.
///
/// Returns `None` when the payload is not a whole number of frames.
pub(crate) fn decode(bytes: &[u8], channels: u16) -> Option<Vec<Vec<f32>>> {
    let channels = usize::from(channels);
    if channels == 0 || bytes.len() % (channels * 2) != 0 {
        return None;
    }

    let frames = bytes.len() / (channels * 2);
    let mut out = vec![Vec::with_capacity(frames); channels];

    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let sample = i16::from_be_bytes([pair[0], pair[1]]);
        if let Some(channel) = out.get_mut(i % channels) {
            channel.push(dequantize(sample));
        }
    }

    Some(out)
}
