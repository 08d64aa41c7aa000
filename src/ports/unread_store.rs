//! Unread Count Store Port - Durable room → unread count map.
//!
//! Read once when the hub starts, then written through on every counter
//! mutation so counts survive a restart.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::chat::RoomId;

/// Errors that can occur while loading or saving unread counts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnreadStoreError {
    #[error("Failed to serialize unread counts: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize unread counts: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for persisting unread counters
#[async_trait]
pub trait UnreadCountStore: Send + Sync {
    /// Load all persisted counts. A store that was never written returns an empty map.
    async fn load(&self) -> Result<HashMap<RoomId, u32>, UnreadStoreError>;

    /// Replace the persisted counts with `counts`.
    async fn save(&self, counts: &HashMap<RoomId, u32>) -> Result<(), UnreadStoreError>;
}
