//! In-Memory Unread Count Store Adapter
//!
//! Useful for testing and for sessions that should not persist counts.
//! Clones share the same underlying map, so a clone handed to a hub can be
//! inspected afterwards (or handed to a second hub to simulate a reload).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::chat::RoomId;
use crate::ports::{UnreadCountStore, UnreadStoreError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryUnreadCountStore {
    counts: Arc<RwLock<HashMap<RoomId, u32>>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryUnreadCountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `counts`.
    pub fn with_counts(counts: HashMap<RoomId, u32>) -> Self {
        Self {
            counts: Arc::new(RwLock::new(counts)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current persisted value for a room.
    pub async fn get(&self, room: &RoomId) -> Option<u32> {
        self.counts.read().await.get(room).copied()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnreadCountStore for InMemoryUnreadCountStore {
    async fn load(&self) -> Result<HashMap<RoomId, u32>, UnreadStoreError> {
        Ok(self.counts.read().await.clone())
    }

    async fn save(&self, counts: &HashMap<RoomId, u32>) -> Result<(), UnreadStoreError> {
        *self.counts.write().await = counts.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
