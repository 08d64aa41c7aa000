//! Time-window deduplication of notifications.
//!
//! A flaky transport or a duplicate server push can deliver the same
//! logical event several times in quick succession. Deliveries are keyed
//! by `(kind, entity_id)`; a key delivered within the trailing window is
//! suppressed. Suppressed attempts do not extend the window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use super::event::NotificationKind;

pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(3);

/// Entries older than the window are swept once the map grows past this.
const PRUNE_THRESHOLD: usize = 512;

#[derive(Debug)]
pub struct NotificationDeduplicator {
    window: Duration,
    last_delivery: HashMap<(NotificationKind, String), Instant>,
}

impl NotificationDeduplicator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_delivery: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns true, and records the delivery, unless the same key was
    /// delivered within the window.
    pub fn should_deliver(&mut self, kind: NotificationKind, entity_id: &str) -> bool {
        self.should_deliver_at(kind, entity_id, Instant::now())
    }

    /// [`should_deliver`](Self::should_deliver) with an explicit clock reading.
    pub fn should_deliver_at(&mut self, kind: NotificationKind, entity_id: &str, now: Instant) -> bool {
        let key = (kind, entity_id.to_string());

        if let Some(last) = self.last_delivery.get(&key) {
            if now.saturating_duration_since(*last) < self.window {
                debug!(kind = %kind, entity_id, "Duplicate notification suppressed");
                return false;
            }
        }

        self.last_delivery.insert(key, now);
        if self.last_delivery.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }
        true
    }

    /// Number of keys currently remembered.
    pub fn tracked_keys(&self) -> usize {
        self.last_delivery.len()
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.last_delivery
            .retain(|_, last| now.saturating_duration_since(*last) < window);
    }
}

impl Default for NotificationDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn second_new_order_within_window_is_suppressed() {
        let mut dedup = NotificationDeduplicator::default();
        let t0 = Instant::now();

        assert!(dedup.should_deliver_at(NotificationKind::NewOrder, "X", t0));
        assert!(!dedup.should_deliver_at(
            NotificationKind::NewOrder,
            "X",
            t0 + Duration::from_millis(500)
        ));
        assert!(dedup.should_deliver_at(
            NotificationKind::NewOrder,
            "X",
            t0 + Duration::from_secs(4)
        ));
    }

    #[test]
    fn different_kinds_for_same_entity_are_independent() {
        let mut dedup = NotificationDeduplicator::default();
        let t0 = Instant::now();

        assert!(dedup.should_deliver_at(NotificationKind::NewOrder, "X", t0));
        assert!(dedup.should_deliver_at(NotificationKind::OrderCancelled, "X", t0));
        assert!(dedup.should_deliver_at(NotificationKind::NewOrder, "Y", t0));
    }

    #[test]
    fn suppressed_attempts_do_not_extend_window() {
        let mut dedup = NotificationDeduplicator::default();
        let t0 = Instant::now();

        assert!(dedup.should_deliver_at(NotificationKind::ReturnRequested, "X", t0));
        assert!(!dedup.should_deliver_at(
            NotificationKind::ReturnRequested,
            "X",
            t0 + Duration::from_millis(2900)
        ));
        assert!(dedup.should_deliver_at(
            NotificationKind::ReturnRequested,
            "X",
            t0 + Duration::from_millis(3100)
        ));
    }

    #[test]
    fn stale_keys_are_pruned_when_map_grows() {
        let mut dedup = NotificationDeduplicator::new(Duration::from_secs(1));
        let t0 = Instant::now();

        for i in 0..PRUNE_THRESHOLD {
            dedup.should_deliver_at(NotificationKind::NewOrder, &format!("ord-{}", i), t0);
        }
        assert_eq!(dedup.tracked_keys(), PRUNE_THRESHOLD);

        dedup.should_deliver_at(NotificationKind::NewOrder, "late", t0 + Duration::from_secs(5));
        assert_eq!(dedup.tracked_keys(), 1);
    }

    proptest! {
        #[test]
        fn two_arrivals_collapse_iff_inside_window(gap_ms in 0u64..10_000) {
            let mut dedup = NotificationDeduplicator::default();
            let t0 = Instant::now();

            prop_assert!(dedup.should_deliver_at(NotificationKind::NewOrder, "X", t0));
            let second = dedup.should_deliver_at(
                NotificationKind::NewOrder,
                "X",
                t0 + Duration::from_millis(gap_ms),
            );
            prop_assert_eq!(second, gap_ms >= 3_000);
        }
    }
}
