//! Change notification fan-out.

use choreboard_proto::event::ChangeEvent;
use tokio::sync::broadcast;

/// Publishes and subscribes to out-of-band change events.
///
/// The controller publishes after every mutation; listeners (other sessions,
/// the notification trigger) subscribe and reconcile on receipt.
pub trait ChangeNotifier: Send + Sync {
    /// Announce a change. Must not block; delivery is best-effort.
    fn publish(&self, event: ChangeEvent);

    /// Subscribe to all future events.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// In-process notifier backed by a [`broadcast`] channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl BroadcastNotifier {
    /// Create a notifier whose subscribers may lag by up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, event: ChangeEvent) {
        // No subscribers is fine: nobody needs to reconcile.
        let _ = self.tx.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}
