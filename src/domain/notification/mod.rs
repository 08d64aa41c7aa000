//! Notifications and their deduplication.

mod dedup;
mod event;

pub use dedup::{NotificationDeduplicator, DEFAULT_DEDUP_WINDOW};
pub use event::{Notification, NotificationKind};
