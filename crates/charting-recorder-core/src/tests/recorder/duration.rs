use crate::tests::fakes::{Harness, MicBehavior, tone_chunk};

use std::time::Duration;

use tokio::time::sleep;

/// WHAT: Three seconds of recording finalize with duration 3
/// WHY: The reported length must match the active recording time
#[tokio::test(start_paused = true)]
async fn given_three_seconds_of_recording_when_stopping_then_duration_is_three() {
    // Given: A session recording for 3 s
    let h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    for _ in 0..3 {
        sleep(Duration::from_secs(1)).await;
        h.rig.emit(tone_chunk(1.0));
    }

    // When: Stopping and waiting for finalization
    h.recorder.stop_recording();
    let state = h.wait_for_artifact().await;

    // Then: Duration 3 and a WAV artifact
    assert_eq!(state.duration_seconds, 3);
    assert!(!state.is_recording);
    assert!(state.audio_artifact.unwrap().is_wav());
}

/// WHAT: Time spent paused never counts toward the duration
/// WHY: Pausing mid-consultation must not inflate the recorded length
#[tokio::test(start_paused = true)]
async fn given_pause_before_any_time_when_resuming_later_then_only_active_time_counts() {
    // Given: Start, immediately pause for 5 s, resume for 2 s
    let h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    h.recorder.pause_recording();
    sleep(Duration::from_secs(5)).await;
    h.recorder.resume_recording();
    sleep(Duration::from_secs(2)).await;

    // When: Stopping
    h.recorder.stop_recording();

    // Then: Only the 2 active seconds count
    assert_eq!(h.recorder.get_state().duration_seconds, 2);
}

/// WHAT: The duration freezes while paused and continues after resume
/// WHY: The on-screen timer must stop exactly when the user pauses
#[tokio::test(start_paused = true)]
async fn given_paused_session_when_time_passes_then_duration_is_frozen() {
    // Given: 2 s of recording, then paused
    let h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    sleep(Duration::from_secs(2)).await;
    h.recorder.pause_recording();
    assert_eq!(h.recorder.get_state().duration_seconds, 2);

    // When: 10 s pass while paused
    sleep(Duration::from_secs(10)).await;

    // Then: Still 2
    assert_eq!(h.recorder.get_state().duration_seconds, 2);

    // When: Resuming for 1.5 s
    h.recorder.resume_recording();
    sleep(Duration::from_millis(1500)).await;

    // Then: Whole seconds only
    assert_eq!(h.recorder.get_state().duration_seconds, 3);
}

/// WHAT: Published durations only grow during a session
/// WHY: A timer that jumps backwards reads as a glitch
#[tokio::test(start_paused = true)]
async fn given_mixed_pauses_when_observing_then_durations_never_decrease() {
    // Given: A session alternating 1.2 s recording and 0.7 s pauses
    let mut h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();
    for _ in 0..4 {
        sleep(Duration::from_millis(1200)).await;
        h.recorder.pause_recording();
        sleep(Duration::from_millis(700)).await;
        h.recorder.resume_recording();
    }

    // When: Stopping
    h.recorder.stop_recording();

    // Then: Durations are monotonic and end at floor(4.8)
    let durations: Vec<u64> = h
        .drain_updates()
        .iter()
        .map(|s| s.duration_seconds)
        .collect();
    assert!(durations.windows(2).all(|w| w[0] <= w[1]), "{durations:?}");
    assert_eq!(durations.last(), Some(&4));
}

/// WHAT: The ticker publishes the running duration while recording
/// WHY: The UI shows a live timer without polling
#[tokio::test(start_paused = true)]
async fn given_recording_when_seconds_elapse_then_each_second_is_published() {
    let mut h = Harness::new(MicBehavior::Grant);
    h.recorder.start_recording().await.unwrap();

    sleep(Duration::from_millis(3050)).await;

    let seen: Vec<u64> = h
        .drain_updates()
        .iter()
        .map(|s| s.duration_seconds)
        .collect();
    for second in 1..=3 {
        assert!(seen.contains(&second), "missing {second} in {seen:?}");
    }
    assert_eq!(h.recorder.get_state().duration_seconds, 3);
}
