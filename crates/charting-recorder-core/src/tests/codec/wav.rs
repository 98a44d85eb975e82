use crate::{
    TranscodeError,
    codec::{DecodedAudio, WAV_HEADER_LEN, WavHeader, dequantize, quantize, wav},
};

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

fn sine(frequency: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * seconds) as usize;
    (0..frames)
        .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// WHAT: Encoded header fields agree with each other and the payload
/// WHY: Players reject files whose RIFF and data sizes disagree
#[test]
fn given_stereo_pcm_when_encoding_then_header_fields_are_consistent() {
    // Given: 100 stereo frames at 22050 Hz
    let audio = DecodedAudio {
        channels: vec![vec![0.25; 100], vec![-0.25; 100]],
        sample_rate: 22_050,
    };

    // When: Encoding to WAV
    let bytes = wav::encode(&audio).unwrap();

    // Then: Every size and rate field is derived consistently
    let header = WavHeader::parse(&bytes).unwrap();
    assert_eq!(header.channels, 2);
    assert_eq!(header.sample_rate, 22_050);
    assert_eq!(header.block_align(), 4);
    assert_eq!(header.byte_rate(), 22_050 * 4);
    assert_eq!(header.data_len as usize, 100 * 2 * 2);
    assert_eq!(bytes.len(), WAV_HEADER_LEN + header.data_len as usize);
    assert_eq!(
        u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize,
        bytes.len() - 8
    );
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..16], b"WAVEfmt ");
    assert_eq!(&bytes[36..40], b"data");
}

/// WHAT: A 1 kHz sine survives encoding within 16-bit quantization error
/// WHY: The artifact must reproduce the captured signal for any standard reader
#[test]
fn given_one_second_sine_when_encoded_then_standard_reader_reproduces_samples() {
    // Given: 1 s of a 1 kHz sine, mono, 44.1 kHz
    let samples = sine(1000.0, 44_100, 1.0);
    let audio = DecodedAudio {
        channels: vec![samples.clone()],
        sample_rate: 44_100,
    };

    // When: Encoding and reading back with hound
    let bytes = wav::encode(&audio).unwrap();
    let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    let read: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();

    // Then: Format matches and every sample is within one quantization step
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 44_100);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, SampleFormat::Int);
    assert_eq!(read.len(), 44_100);

    // One quantization step, plus slack for f32 rounding in the scale.
    let tolerance = 1.0 / 32767.0 + 1e-6;
    for (original, stored) in samples.iter().zip(&read) {
        let restored = dequantize(*stored);
        let error = (f64::from(*original) - f64::from(restored)).abs();
        assert!(
            error <= tolerance,
            "sample {original} came back as {restored}"
        );
    }
}

/// WHAT: Channels are interleaved frame by frame, little-endian
/// WHY: Multichannel WAV stores L,R,L,R; a planar layout would scramble audio
#[test]
fn given_two_channels_when_encoding_then_samples_are_interleaved_little_endian() {
    // Given: Left at +0.5, right at -0.5
    let audio = DecodedAudio {
        channels: vec![vec![0.5, 0.5], vec![-0.5, -0.5]],
        sample_rate: 8_000,
    };

    // When: Encoding
    let bytes = wav::encode(&audio).unwrap();

    // Then: Data alternates left/right
    let data: Vec<i16> = bytes[WAV_HEADER_LEN..]
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(data, vec![16383, -16384, 16383, -16384]);
}

/// WHAT: Quantization clamps and scales asymmetrically
/// WHY: Full positive scale must map to 32767 without wrapping
#[test]
fn given_edge_samples_when_quantizing_then_values_are_clamped() {
    // Given / When / Then: Extremes and out-of-range input
    assert_eq!(quantize(1.0), 32767);
    assert_eq!(quantize(-1.0), -32768);
    assert_eq!(quantize(2.5), 32767);
    assert_eq!(quantize(-7.0), -32768);
    assert_eq!(quantize(0.0), 0);
    assert_eq!(quantize(f32::NAN), 0);
}

/// WHAT: Zero frames still produce a valid header
/// WHY: An empty capture finalizes to an empty but well-formed WAV
#[test]
fn given_no_frames_when_encoding_then_header_only_file_is_produced() {
    // Given: One empty channel
    let audio = DecodedAudio {
        channels: vec![Vec::new()],
        sample_rate: 44_100,
    };

    // When: Encoding
    let bytes = wav::encode(&audio).unwrap();

    // Then: Exactly a header with a zero data length
    assert_eq!(bytes.len(), WAV_HEADER_LEN);
    assert_eq!(WavHeader::parse(&bytes).unwrap().data_len, 0);
}

/// WHAT: Structurally invalid PCM is rejected
/// WHY: A malformed header would be worse than falling back to the source blob
#[test]
fn given_invalid_pcm_when_encoding_then_encode_failed() {
    let no_channels = DecodedAudio {
        channels: Vec::new(),
        sample_rate: 44_100,
    };
    let ragged = DecodedAudio {
        channels: vec![vec![0.0; 3], vec![0.0; 2]],
        sample_rate: 44_100,
    };
    let zero_rate = DecodedAudio {
        channels: vec![vec![0.0; 3]],
        sample_rate: 0,
    };

    for audio in [no_channels, ragged, zero_rate] {
        assert!(matches!(
            wav::encode(&audio),
            Err(TranscodeError::EncodeFailed { .. })
        ));
    }
}

/// WHAT: Parsing refuses anything but a canonical header
/// WHY: Callers use parse to tell WAV output from fallback blobs
#[test]
fn given_non_wav_bytes_when_parsing_header_then_none() {
    assert_eq!(WavHeader::parse(b"OggS"), None);
    assert_eq!(WavHeader::parse(&[0u8; WAV_HEADER_LEN]), None);
}
