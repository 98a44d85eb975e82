use std::time::Duration;

use tokio::time::Instant;

/// Active-time accounting for one session.
///
/// Paused intervals are excluded: resuming folds the finished pause into
/// `total_paused` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionClock {
    started_at: Instant,
    total_paused: Duration,
    paused_at: Option<Instant>,
}

impl SessionClock {
    pub(crate) fn start(now: Instant) -> Self {
        Self {
            started_at: now,
            total_paused: Duration::ZERO,
            paused_at: None,
        }
    }

    pub(crate) fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub(crate) fn resume(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused += now.saturating_duration_since(paused_at);
        }
    }

    /// Recording time net of every pause, including one still in progress.
    pub(crate) fn active(&self, now: Instant) -> Duration {
        let current_pause = self
            .paused_at
            .map(|p| now.saturating_duration_since(p))
            .unwrap_or_default();

        now.saturating_duration_since(self.started_at)
            .saturating_sub(self.total_paused)
            .saturating_sub(current_pause)
    }

    /// [`SessionClock::active`] floored to whole seconds.
    pub(crate) fn elapsed_seconds(&self, now: Instant) -> u64 {
        self.active(now).as_secs()
    }
}
