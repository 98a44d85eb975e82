use crate::{
    PreviewStore, RecorderPhase,
    codec::{PcmDecoder, StandardDecoder, WAV_HEADER_LEN, WAV_MIME_TYPE, WavHeader},
    recorder::transcode,
    tests::fakes::{
        FAKE_MIME, FAKE_RATE, FailingDecoder, FakeMicrophone, GatedDecoder, Harness, MicBehavior,
        Rig, settle, tone_chunk,
    },
};

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{sync::Notify, time::Instant};

/// WHAT: Stopping yields a canonical WAV built from every chunk in order
/// WHY: The artifact is the only output of a session
#[tokio::test(start_paused = true)]
async fn given_chunks_and_tail_when_stopping_then_wav_holds_all_audio() {
    // Given: Two timeslice chunks and buffered tail data
    let h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    h.rig.emit(tone_chunk(1.0));
    h.rig.emit(tone_chunk(1.0));
    h.rig.queue_tail(tone_chunk(0.5));

    // When: Stopping
    h.recorder.stop_recording();
    let state = h.wait_for_artifact().await;

    // Then: One WAV covering 2.5 s of mono audio at the capture rate
    let artifact = state.audio_artifact.unwrap();
    assert_eq!(artifact.mime_type(), WAV_MIME_TYPE);

    let header = WavHeader::parse(artifact.bytes()).unwrap();
    assert_eq!(header.channels, 1);
    assert_eq!(header.sample_rate, FAKE_RATE);
    assert_eq!(header.data_len as usize, (FAKE_RATE as usize * 5 / 2) * 2);
    assert_eq!(artifact.len(), WAV_HEADER_LEN + header.data_len as usize);

    assert!(state.audio_preview.is_some());
    assert_eq!(h.recorder.phase(), RecorderPhase::Stopped);
    assert_eq!(h.rig.live_tracks(), 0);
}

/// WHAT: The preview handle resolves to the finalized artifact
/// WHY: Playback reads audio through the handle
#[tokio::test(start_paused = true)]
async fn given_finalized_session_when_resolving_preview_then_artifact_is_returned() {
    let h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    h.rig.emit(tone_chunk(0.1));
    h.recorder.stop_recording();

    let state = h.wait_for_artifact().await;
    let preview = state.audio_preview.unwrap();

    assert!(preview.as_str().starts_with("blob:"));
    assert_eq!(h.previews.resolve(&preview), state.audio_artifact);
    assert_eq!(h.previews.live_handles(), 1);
}

/// WHAT: Recording stops being reported before the artifact appears
/// WHY: Observers rely on is_recording=false preceding the artifact
#[tokio::test(start_paused = true)]
async fn given_stop_when_observing_then_stop_snapshot_precedes_artifact_snapshot() {
    // Given: A recording that is stopped
    let mut h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    h.rig.emit(tone_chunk(0.5));
    h.recorder.pause_recording();
    h.recorder.resume_recording();
    h.recorder.stop_recording();
    h.wait_for_artifact().await;

    // When: Inspecting every snapshot
    let updates = h.drain_updates();

    // Then: Stop precedes the artifact, and no snapshot breaks the flag rules
    let stop_at = updates.iter().position(|s| !s.is_recording).unwrap();
    let artifact_at = updates
        .iter()
        .position(|s| s.audio_artifact.is_some())
        .unwrap();
    assert!(stop_at < artifact_at);

    for state in &updates {
        assert!(!(state.is_recording && state.audio_artifact.is_some()));
        assert!(!state.is_paused || state.is_recording);
    }
}

/// WHAT: A failing decoder falls back to the original captured blob
/// WHY: Losing the recording is worse than keeping a non-WAV format
#[tokio::test(start_paused = true)]
async fn given_failing_decoder_when_stopping_then_original_blob_is_kept() {
    // Given: A recorder whose decoder always fails
    let h = Harness::with_decoder(Arc::new(FailingDecoder));
    h.recorder.start_recording().await.unwrap();
    h.rig.emit(vec![1, 2, 3, 4]);
    h.rig.queue_tail(vec![5, 6]);

    // When: Stopping
    h.recorder.stop_recording();
    let state = h.wait_for_artifact().await;

    // Then: The concatenated chunks with the session's MIME type
    let artifact = state.audio_artifact.unwrap();
    assert_eq!(artifact.bytes(), &[1, 2, 3, 4, 5, 6]);
    assert_eq!(artifact.mime_type(), FAKE_MIME);
    assert!(!artifact.is_wav());
}

/// WHAT: Cancel during an in-flight finalization discards its result
/// WHY: A cancelled session must never surface audio afterwards
#[tokio::test(start_paused = true)]
async fn given_finalization_in_flight_when_cancelling_then_result_is_discarded() {
    // Given: Finalization blocked inside the decoder
    let gate = Arc::new(Notify::new());
    let mut h = Harness::with_decoder(Arc::new(GatedDecoder {
        gate: Arc::clone(&gate),
    }));
    h.recorder.start_recording().await.unwrap();
    h.rig.emit(tone_chunk(1.0));
    h.recorder.stop_recording();
    settle().await;
    assert_eq!(h.recorder.phase(), RecorderPhase::Finalizing);

    // When: Cancelling, then letting the decoder finish
    h.recorder.cancel_recording();
    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Then: No artifact, no handle, nothing published after the cancel
    let state = h.recorder.get_state();
    assert!(state.audio_artifact.is_none());
    assert!(state.audio_preview.is_none());
    assert_eq!(state.duration_seconds, 0);
    assert_eq!(h.recorder.phase(), RecorderPhase::Cancelled);
    assert_eq!(h.previews.live_handles(), 0);
    assert_eq!(h.rig.live_tracks(), 0);

    let updates = h.drain_updates();
    assert!(updates.iter().all(|s| s.audio_artifact.is_none()));
}

/// WHAT: Cancel after finalization clears the artifact and its handle
/// WHY: The user discarded the recording after hearing it
#[tokio::test(start_paused = true)]
async fn given_finalized_session_when_cancelling_then_artifact_is_discarded() {
    let h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    h.rig.emit(tone_chunk(0.5));
    h.recorder.stop_recording();
    h.wait_for_artifact().await;

    h.recorder.cancel_recording();

    assert!(h.recorder.get_state().audio_artifact.is_none());
    assert!(h.recorder.get_audio_file("recording.wav").is_none());
    assert_eq!(h.previews.live_handles(), 0);
}

/// WHAT: A new start supersedes a finalization still in flight
/// WHY: The stale session's audio must not overwrite the new one
#[tokio::test(start_paused = true)]
async fn given_finalization_in_flight_when_starting_new_session_then_stale_result_is_dropped() {
    // Given: Session one blocked in finalization
    let gate = Arc::new(Notify::new());
    let h = Harness::with_decoder(Arc::new(GatedDecoder {
        gate: Arc::clone(&gate),
    }));
    h.recorder.start_recording().await.unwrap();
    h.rig.emit(vec![0; 8]);
    h.recorder.stop_recording();
    settle().await;

    // When: Starting session two, releasing the gate, then finishing two
    h.recorder.start_recording().await.unwrap();
    gate.notify_one();
    settle().await;
    assert!(h.recorder.get_state().audio_artifact.is_none());

    h.rig.emit(tone_chunk(0.5));
    h.recorder.stop_recording();
    gate.notify_one();
    let state = h.wait_for_artifact().await;

    // Then: Only session two's audio is published
    let header = WavHeader::parse(state.audio_artifact.unwrap().bytes()).unwrap();
    assert_eq!(header.data_len as usize, (FAKE_RATE as usize / 2) * 2);
    assert_eq!(h.previews.live_handles(), 1);
    assert_eq!(h.rig.live_tracks(), 0);
}

/// WHAT: A session with no captured audio still finalizes
/// WHY: Stopping immediately must not leave the recorder stuck
#[tokio::test(start_paused = true)]
async fn given_no_chunks_when_stopping_then_empty_wav_is_produced() {
    let h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    h.recorder.stop_recording();

    let state = h.wait_for_artifact().await;

    let artifact = state.audio_artifact.unwrap();
    assert!(artifact.is_wav());
    assert_eq!(artifact.len(), WAV_HEADER_LEN);
}

/// WHAT: A preferred encoding is chosen when the stream supports it
/// WHY: Compressed chunks are smaller; conversion falls back if needed
#[tokio::test(start_paused = true)]
async fn given_stream_supporting_opus_when_stopping_then_unconvertible_blob_is_kept() {
    // Given: A stream that can record Opus-in-WebM
    let rig = Arc::new(Rig::default());
    let microphone =
        FakeMicrophone::new(MicBehavior::Grant, Arc::clone(&rig)).supporting("audio/webm;codecs=opus");
    let h = Harness::from_microphone(microphone, rig, Arc::new(StandardDecoder));
    h.recorder.start_recording().await.unwrap();
    h.rig.emit(vec![0x1a, 0x45, 0xdf, 0xa3]);

    // When: Stopping
    h.recorder.stop_recording();
    let state = h.wait_for_artifact().await;

    // Then: The WebM bytes are kept since they cannot be decoded here
    let artifact = state.audio_artifact.unwrap();
    assert_eq!(artifact.mime_type(), "audio/webm;codecs=opus");
    assert_eq!(artifact.bytes(), &[0x1a, 0x45, 0xdf, 0xa3]);
}

/// WHAT: The transcode helper labels its output by the path it took
/// WHY: Callers tell WAV output from fallback blobs by MIME type
#[tokio::test]
async fn given_decodable_and_undecodable_input_when_transcoding_then_mime_reflects_outcome() {
    let decoder: &dyn PcmDecoder = &StandardDecoder;

    let wav = transcode(decoder, tone_chunk(0.01).into(), FAKE_MIME).await;
    let fallback = transcode(decoder, vec![9u8, 9, 9].into(), "audio/ogg;codecs=opus").await;

    assert!(wav.is_wav());
    assert_eq!(fallback.mime_type(), "audio/ogg;codecs=opus");
    assert_eq!(fallback.bytes(), &[9, 9, 9]);
}

/// WHAT: Long recordings finalize without stalling other tasks
/// WHY: Decoding and WAV encoding are CPU-bound and run on the blocking pool
#[tokio::test(flavor = "current_thread")]
async fn given_long_recording_when_finalizing_then_runtime_keeps_running() {
    // Given: Two minutes of buffered audio
    let h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    let second = tone_chunk(1.0);
    for _ in 0..120 {
        h.rig.emit(second.clone());
    }
    settle().await;

    // When: Stopping while a heartbeat shares the single runtime thread
    let max_gap = Arc::new(Mutex::new(Duration::ZERO));
    let heartbeat = tokio::spawn({
        let max_gap = Arc::clone(&max_gap);
        async move {
            let mut last = Instant::now();
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                let now = Instant::now();
                let mut gap = max_gap.lock().unwrap();
                *gap = (*gap).max(now - last);
                last = now;
            }
        }
    });
    h.recorder.stop_recording();
    let state = h.wait_for_artifact().await;
    heartbeat.abort();

    // Then: The WAV arrived and the heartbeat never stalled behind it
    let artifact = state.audio_artifact.unwrap();
    assert!(artifact.is_wav());
    assert_eq!(artifact.len(), WAV_HEADER_LEN + second.len() * 120);

    let gap = *max_gap.lock().unwrap();
    assert!(gap < Duration::from_millis(250), "runtime stalled for {gap:?}");
}
