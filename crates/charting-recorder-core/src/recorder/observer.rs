use crate::recorder::RecordingState;

use tokio::sync::mpsc;
use tracing::debug;

/// Receives a [`RecordingState`] snapshot after every transition, in order.
///
/// Called while the recorder's state lock is held, so implementations must
/// not call back into the recorder. Forward to a channel instead with
/// [`ChannelObserver`].
pub trait StateObserver: Send + Sync {
    /// Handles one snapshot.
    fn on_state_change(&self, state: &RecordingState);
}

impl<F> StateObserver for F
where
    F: Fn(&RecordingState) + Send + Sync,
{
    fn on_state_change(&self, state: &RecordingState) {
        self(state)
    }
}

/// Forwards snapshots into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver(pub mpsc::UnboundedSender<RecordingState>);

impl StateObserver for ChannelObserver {
    fn on_state_change(&self, state: &RecordingState) {
        if self.0.send(state.clone()).is_err() {
            debug!("State observer channel closed");
        }
    }
}
