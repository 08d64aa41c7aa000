//! Message history store - per-room histories plus unread counters.
//!
//! Owns the unread counters exclusively after start-up: they are read from
//! the [`UnreadCountStore`] once in [`MessageStore::load`] and every later
//! mutation is written straight back.
//!
//! # Viewed room
//!
//! At most one room is "being viewed". Arrivals in that room do not count
//! as unread. Switching the viewed room bumps a view generation; any
//! older-page load started under a previous generation is stale and its
//! result is discarded instead of applied.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};

use crate::domain::chat::{
    AppendOutcome, ChatMessage, OlderPage, RoomHistory, RoomId, ScrollAction, ScrollPosition,
    UnreadCounters,
};
use crate::domain::foundation::Timestamp;
use crate::ports::UnreadCountStore;

use super::error::HubError;

/// Outcome of a `load_older` round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOlderOutcome {
    Loaded(OlderPage),
    /// The response arrived after the viewed room changed.
    Discarded,
    /// Nothing requested: a load is in flight or history is exhausted.
    Skipped,
}

/// An older-page load in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOlderTicket {
    pub room: RoomId,
    pub before: Timestamp,
    generation: u64,
}

pub struct MessageStore {
    histories: HashMap<RoomId, RoomHistory>,
    page_size: usize,
    viewed: Option<RoomId>,
    view_generation: u64,
    unread: UnreadCounters,
    store: Arc<dyn UnreadCountStore>,
}

impl MessageStore {
    /// Restore persisted unread counts and start with empty histories.
    pub async fn load(store: Arc<dyn UnreadCountStore>, page_size: usize) -> Result<Self, HubError> {
        let counts = store.load().await?;
        info!(rooms = counts.len(), "Unread counts restored");
        Ok(Self {
            histories: HashMap::new(),
            page_size,
            viewed: None,
            view_generation: 0,
            unread: UnreadCounters::from_map(counts),
            store,
        })
    }

    pub fn history(&self, room: &RoomId) -> Option<&RoomHistory> {
        self.histories.get(room)
    }

    pub fn viewed_room(&self) -> Option<&RoomId> {
        self.viewed.as_ref()
    }

    pub fn unread_count(&self, room: &RoomId) -> u32 {
        self.unread.get(room)
    }

    pub fn total_unread(&self) -> u32 {
        self.unread.total()
    }

    /// Add a live-pushed message to its room.
    pub fn append_live(&mut self, message: ChatMessage) -> AppendOutcome {
        let room = message.room.clone();
        self.history_mut(&room).append_live(message)
    }

    /// Merge the initial page sent after joining `room`.
    pub fn apply_initial(&mut self, room: &RoomId, messages: Vec<ChatMessage>) -> usize {
        let inserted = self.history_mut(room).apply_initial(messages);
        debug!(room = %room, inserted, "Initial history applied");
        inserted
    }

    /// Count an arrival as unread unless the admin sent it or the room is
    /// being viewed. Returns the new count when it changed.
    pub async fn record_arrival(&mut self, message: &ChatMessage) -> Result<Option<u32>, HubError> {
        if message.is_from_admin() || self.viewed.as_ref() == Some(&message.room) {
            return Ok(None);
        }
        let mut next = self.unread.clone();
        let count = next.increment(&message.room);
        self.commit(next).await?;
        Ok(Some(count))
    }

    /// Zero the counter of `room` and persist the zero.
    pub async fn mark_viewed(&mut self, room: &RoomId) -> Result<(), HubError> {
        let mut next = self.unread.clone();
        next.reset(room);
        self.commit(next).await
    }

    /// Switch the viewed room.
    ///
    /// Any older-page load of the previously viewed room is cancelled. The
    /// newly viewed room's counter is zeroed.
    pub async fn set_viewed(&mut self, room: Option<RoomId>) -> Result<(), HubError> {
        if self.viewed == room {
            return Ok(());
        }

        self.view_generation += 1;
        if let Some(previous) = self.viewed.take() {
            if let Some(history) = self.histories.get_mut(&previous) {
                history.cancel_load_older();
            }
        }
        debug!(room = ?room.as_ref().map(RoomId::as_str), generation = self.view_generation, "Viewed room changed");

        self.viewed = room;
        match self.viewed.clone() {
            Some(room) => self.mark_viewed(&room).await,
            None => Ok(()),
        }
    }

    /// Start an older-page load for `room`.
    ///
    /// Returns `None` if a load is already in flight, history is exhausted,
    /// or nothing is loaded yet to page back from.
    pub fn begin_load_older(&mut self, room: &RoomId) -> Option<LoadOlderTicket> {
        let generation = self.view_generation;
        let before = self.histories.get_mut(room)?.begin_load_older()?;
        Some(LoadOlderTicket {
            room: room.clone(),
            before,
            generation,
        })
    }

    /// Apply the page answering `ticket`.
    ///
    /// Fails with [`HubError::StaleResult`] when the viewed room changed since
    /// the load began; the page is dropped.
    pub fn apply_older(
        &mut self,
        ticket: &LoadOlderTicket,
        messages: Vec<ChatMessage>,
    ) -> Result<OlderPage, HubError> {
        if ticket.generation != self.view_generation {
            if let Some(history) = self.histories.get_mut(&ticket.room) {
                history.cancel_load_older();
            }
            debug!(room = %ticket.room, "Older page arrived after view change, discarded");
            return Err(HubError::StaleResult {
                room: ticket.room.clone(),
            });
        }

        let page = self.history_mut(&ticket.room).finish_load_older(messages);
        debug!(room = %ticket.room, inserted = page.inserted, has_more = page.has_more, "Older page applied");
        Ok(page)
    }

    /// Abandon the load started with `ticket`.
    pub fn cancel_older(&mut self, ticket: &LoadOlderTicket) {
        if let Some(history) = self.histories.get_mut(&ticket.room) {
            history.cancel_load_older();
        }
    }

    pub fn record_scroll(&mut self, room: &RoomId, position: ScrollPosition) -> ScrollAction {
        self.history_mut(room).record_scroll(position)
    }

    /// Forget everything about a closed room, including its counter.
    pub async fn remove_room(&mut self, room: &RoomId) -> Result<(), HubError> {
        self.histories.remove(room);
        if self.viewed.as_ref() == Some(room) {
            self.viewed = None;
            self.view_generation += 1;
        }
        let mut next = self.unread.clone();
        if next.remove(room) {
            self.commit(next).await?;
        }
        Ok(())
    }

    fn history_mut(&mut self, room: &RoomId) -> &mut RoomHistory {
        let page_size = self.page_size;
        self.histories
            .entry(room.clone())
            .or_insert_with(|| RoomHistory::new(room.clone(), page_size))
    }

    /// Write `next` through to the store and adopt it only once the save
    /// succeeded, so memory never runs ahead of persistence.
    async fn commit(&mut self, next: UnreadCounters) -> Result<(), HubError> {
        self.store.save(&next.to_map()).await?;
        self.unread = next;
        Ok(())
    }
}

/// Correlates `olderMessages` responses with the request that asked for them.
///
/// One slot per room; a new request for the same room supersedes the old
/// one, whose waiter then sees its channel closed.
#[derive(Default)]
pub struct OlderPageRequests {
    pending: Mutex<HashMap<RoomId, oneshot::Sender<Vec<ChatMessage>>>>,
}

impl OlderPageRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, room: &RoomId) -> oneshot::Receiver<Vec<ChatMessage>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(room.clone(), tx);
        rx
    }

    /// Hand a response to its waiter. Returns false if nobody asked for it.
    pub async fn complete(&self, room: &RoomId, messages: Vec<ChatMessage>) -> bool {
        match self.pending.lock().await.remove(room) {
            Some(tx) => tx.send(messages).is_ok(),
            None => false,
        }
    }

    pub async fn cancel(&self, room: &RoomId) {
        self.pending.lock().await.remove(room);
    }

    /// Drop every pending request. Returns how many there were.
    pub async fn clear(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let count = pending.len();
        pending.clear();
        count
    }
}
