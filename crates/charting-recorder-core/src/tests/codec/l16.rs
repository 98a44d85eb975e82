use crate::codec::l16;

/// WHAT: Stream parameters come back out of the MIME type
/// WHY: Chunks are headerless; the MIME type is the only format record
#[test]
fn given_full_l16_mime_when_parsing_then_rate_and_channels_are_read() {
    assert_eq!(
        l16::parse_params(&l16::mime_type(48_000, 2)),
        Some((48_000, 2))
    );
    assert_eq!(l16::parse_params("audio/L16; rate=16000"), Some((16_000, 1)));
    assert_eq!(l16::parse_params("audio/l16;rate=8000;channels=1"), Some((8_000, 1)));
}

/// WHAT: Missing or zero parameters are rejected
/// WHY: Guessing a rate would silently change playback speed
#[test]
fn given_incomplete_mime_when_parsing_then_none() {
    assert_eq!(l16::parse_params("audio/L16"), None);
    assert_eq!(l16::parse_params("audio/L16;rate=0"), None);
    assert_eq!(l16::parse_params("audio/L16;rate=44100;channels=0"), None);
    assert_eq!(l16::parse_params("audio/webm;codecs=opus"), None);
    assert!(!l16::is_l16("audio/webm;codecs=opus"));
}

/// WHAT: Samples are written big-endian and split back per channel
/// WHY: RFC 2586 mandates network byte order
#[test]
fn given_interleaved_samples_when_encoding_then_big_endian_and_decodable() {
    // Given: Two stereo frames
    let samples = [1.0, -1.0, 0.0, 0.5];

    // When: Encoding then decoding as stereo
    let mut bytes = Vec::new();
    l16::encode_into(&samples, &mut bytes);
    let channels = l16::decode(&bytes, 2).unwrap();

    // Then: Byte order is big-endian and channels are split
    assert_eq!(&bytes[0..4], &[0x7f, 0xff, 0x80, 0x00]);
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0], vec![1.0, 0.0]);
    assert_eq!(channels[1][0], -1.0);
    assert!((channels[1][1] - 0.5).abs() <= 1.0 / 32767.0);
}

/// WHAT: A partial frame is refused
/// WHY: Truncated chunks would shift every following sample across channels
#[test]
fn given_partial_frame_when_decoding_then_none() {
    assert_eq!(l16::decode(&[0, 1, 2], 1), None);
    assert_eq!(l16::decode(&[0, 1, 2, 3, 4, 5], 2), None);
    assert_eq!(l16::decode(&[0, 1], 0), None);
}
