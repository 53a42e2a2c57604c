//! Fire-and-forget notifications for presentation code.
//!
//! The engine calls [`WalkNotifier::notify`] after each successful commit.
//! Implementations must not block and must not fail the caller: delivery
//! problems are logged and the event is dropped.

use pathwalk_types::WalkEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Receives walk events after their commits succeed.
pub trait WalkNotifier: Send + Sync {
    /// Deliver an event. Must return promptly.
    fn notify(&self, event: &WalkEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

impl WalkNotifier for NoOpNotifier {
    fn notify(&self, _event: &WalkEvent) {}
}

/// Forwards events into a bounded channel.
///
/// A full channel drops the event with a warning; a closed channel drops it
/// silently at debug level.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<WalkEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<WalkEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl WalkNotifier for ChannelNotifier {
    fn notify(&self, event: &WalkEvent) {
        match self.sender.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(
                    walker_id = %dropped.walker_id(),
                    kind = dropped.kind().as_str(),
                    "Notification buffer full, event dropped"
                );
            }
            Err(TrySendError::Closed(dropped)) => {
                tracing::debug!(
                    walker_id = %dropped.walker_id(),
                    "Notification channel closed, event dropped"
                );
            }
        }
    }
}
