//! Deduplicated notification fan-out.

use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::domain::notification::{Notification, NotificationDeduplicator, NotificationKind};

/// Passes every notification through the deduplicator and broadcasts the
/// survivors to all subscribers.
pub struct Notifier {
    dedup: Mutex<NotificationDeduplicator>,
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(window: Duration, channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            dedup: Mutex::new(NotificationDeduplicator::new(window)),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Deliver a notification unless the same `(kind, entity_id)` was
    /// delivered within the window. Returns whether it was delivered.
    pub async fn notify(
        &self,
        kind: NotificationKind,
        entity_id: &str,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> bool {
        if !self.dedup.lock().await.should_deliver(kind, entity_id) {
            return false;
        }

        let notification = Notification::new(kind, entity_id, title, body);
        let receivers = self.sender.send(notification).unwrap_or(0);
        debug!(kind = %kind, entity_id, receivers, "Notification delivered");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_within_window_reaches_subscribers_once() {
        let notifier = Notifier::new(Duration::from_secs(3), 8);
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        assert!(notifier.notify(NotificationKind::NewOrder, "X", "New order", "").await);
        assert!(!notifier.notify(NotificationKind::NewOrder, "X", "New order", "").await);

        for rx in [&mut first, &mut second] {
            let n = rx.recv().await.unwrap();
            assert_eq!(n.kind, NotificationKind::NewOrder);
            assert_eq!(n.entity_id, "X");
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn delivery_without_subscribers_still_counts() {
        let notifier = Notifier::new(Duration::from_secs(3), 8);
        assert!(notifier.notify(NotificationKind::ReturnRequested, "Y", "t", "b").await);
        assert!(!notifier.notify(NotificationKind::ReturnRequested, "Y", "t", "b").await);
    }
}
