use crate::recorder::SessionClock;

use std::time::Duration;

use proptest::prelude::*;
use tokio::time::Instant;

/// WHAT: Time spent paused is excluded from active time
/// WHY: Duration must reflect only what was actually recorded
#[test]
fn given_pause_and_resume_when_measuring_then_paused_time_is_excluded() {
    // Given: 3 s recording, 10 s paused, 2 s recording
    let t0 = Instant::now();
    let mut clock = SessionClock::start(t0);
    clock.pause(t0 + Duration::from_secs(3));
    clock.resume(t0 + Duration::from_secs(13));

    // When: Measuring at 15 s wall time
    let elapsed = clock.elapsed_seconds(t0 + Duration::from_secs(15));

    // Then: 5 s active, still advancing after the resume
    assert_eq!(elapsed, 5);
    assert_eq!(clock.elapsed_seconds(t0 + Duration::from_secs(16)), 6);
}

/// WHAT: Active time does not advance during an open pause
/// WHY: The displayed duration must freeze while paused
#[test]
fn given_open_pause_when_measuring_later_then_active_time_is_frozen() {
    let t0 = Instant::now();
    let mut clock = SessionClock::start(t0);
    clock.pause(t0 + Duration::from_millis(2500));

    assert_eq!(clock.active(t0 + Duration::from_secs(60)), Duration::from_millis(2500));
    assert_eq!(clock.elapsed_seconds(t0 + Duration::from_secs(60)), 2);
}

/// WHAT: Repeated pause or resume calls are absorbed
/// WHY: A double pause must not restart the pause interval
#[test]
fn given_double_pause_and_double_resume_when_measuring_then_counted_once() {
    let t0 = Instant::now();
    let mut clock = SessionClock::start(t0);

    clock.pause(t0 + Duration::from_secs(1));
    clock.pause(t0 + Duration::from_secs(4));
    clock.resume(t0 + Duration::from_secs(6));
    clock.resume(t0 + Duration::from_secs(8));

    assert_eq!(clock.elapsed_seconds(t0 + Duration::from_secs(10)), 5);
}

/// WHAT: Measuring before the start instant saturates at zero
/// WHY: Clock skew between callers must not underflow
#[test]
fn given_instant_before_start_when_measuring_then_zero() {
    let t0 = Instant::now() + Duration::from_secs(5);
    let clock = SessionClock::start(t0);

    assert_eq!(clock.active(t0 - Duration::from_secs(1)), Duration::ZERO);
}

proptest! {
    /// WHAT: Any sequence of recording and paused spans sums correctly
    /// WHY: Active time is the sum of recording spans, for every pause pattern
    #[test]
    fn given_any_pause_pattern_when_measuring_then_active_is_sum_of_recording_spans(
        spans in prop::collection::vec((0u64..5_000, 0u64..5_000), 0..20),
        tail in 0u64..5_000,
    ) {
        let t0 = Instant::now();
        let mut clock = SessionClock::start(t0);
        let mut now = t0;
        let mut expected = Duration::ZERO;

        for (recording_ms, paused_ms) in spans {
            now += Duration::from_millis(recording_ms);
            expected += Duration::from_millis(recording_ms);
            clock.pause(now);
            now += Duration::from_millis(paused_ms);
            clock.resume(now);
        }
        now += Duration::from_millis(tail);
        expected += Duration::from_millis(tail);

        prop_assert_eq!(clock.active(now), expected);
        prop_assert_eq!(clock.elapsed_seconds(now), expected.as_secs());
    }
}
