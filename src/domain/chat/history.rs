//! Ordered message history of one room.
//!
//! Holds the messages currently loaded for a room together with the
//! viewport bookkeeping needed for cursor pagination:
//!
//! - live messages append at the tail and only pull the view down when it
//!   was already anchored at the bottom
//! - older pages are inserted above the first visible message, which is
//!   reported back as the scroll anchor
//! - the single scroll notification caused by restoring that anchor is not
//!   mistaken for the user scrolling to the top again

use std::collections::HashSet;

use crate::domain::foundation::{MessageId, Timestamp};

use super::message::ChatMessage;
use super::room::RoomId;

/// Where the viewport sits after a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPosition {
    pub at_top: bool,
    pub at_bottom: bool,
}

impl ScrollPosition {
    pub fn top() -> Self {
        Self {
            at_top: true,
            at_bottom: false,
        }
    }

    pub fn bottom() -> Self {
        Self {
            at_top: false,
            at_bottom: true,
        }
    }

    pub fn middle() -> Self {
        Self {
            at_top: false,
            at_bottom: false,
        }
    }
}

/// What the caller should do in response to a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    None,
    /// The user reached the top and more history may exist.
    LoadOlder { before: Timestamp },
}

/// Result of appending a live message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// False when the message was already present.
    pub appended: bool,
    pub scroll_to_bottom: bool,
}

/// Result of inserting a page of older messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OlderPage {
    pub inserted: usize,
    pub has_more: bool,
    /// Message that was topmost before the insert; the view keeps it in place.
    pub anchor: Option<MessageId>,
}

#[derive(Debug, Clone)]
pub struct RoomHistory {
    room: RoomId,
    messages: Vec<ChatMessage>,
    ids: HashSet<MessageId>,
    page_size: usize,
    has_more: bool,
    loading_older: bool,
    anchored_at_bottom: bool,
    restoring_scroll: bool,
}

impl RoomHistory {
    pub fn new(room: RoomId, page_size: usize) -> Self {
        Self {
            room,
            messages: Vec::new(),
            ids: HashSet::new(),
            page_size: page_size.max(1),
            has_more: true,
            loading_older: false,
            anchored_at_bottom: true,
            restoring_scroll: false,
        }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    pub fn is_anchored_at_bottom(&self) -> bool {
        self.anchored_at_bottom
    }

    pub fn oldest_timestamp(&self) -> Option<Timestamp> {
        self.messages.first().map(|m| m.timestamp)
    }

    /// Adds a live-pushed message. Duplicates (same id) are ignored.
    pub fn append_live(&mut self, message: ChatMessage) -> AppendOutcome {
        let was_anchored = self.anchored_at_bottom;
        let appended = self.insert_sorted(message);
        AppendOutcome {
            appended,
            scroll_to_bottom: appended && was_anchored,
        }
    }

    /// Merges the initial page sent after joining a room.
    ///
    /// Returns the number of messages that were not already present. A page
    /// re-sent into a populated history (e.g. after a rejoin) leaves the
    /// reader's scroll position alone.
    pub fn apply_initial(&mut self, page: Vec<ChatMessage>) -> usize {
        let was_empty = self.messages.is_empty();
        let full_page = page.len() >= self.page_size;
        let inserted = page
            .into_iter()
            .filter(|m| self.insert_sorted(m.clone()))
            .count();
        self.has_more = full_page;
        if was_empty {
            self.anchored_at_bottom = true;
        }
        inserted
    }

    /// Starts an older-page load and returns its cursor.
    ///
    /// Returns `None` while a load is already in flight, once history is
    /// exhausted, or when nothing is loaded yet to page back from.
    pub fn begin_load_older(&mut self) -> Option<Timestamp> {
        if self.loading_older || !self.has_more {
            return None;
        }
        let cursor = self.oldest_timestamp()?;
        self.loading_older = true;
        Some(cursor)
    }

    /// Inserts a page of messages older than the current head.
    ///
    /// A partial or empty page marks history as exhausted.
    pub fn finish_load_older(&mut self, page: Vec<ChatMessage>) -> OlderPage {
        let anchor = self.messages.first().map(|m| m.id.clone());
        let full_page = page.len() >= self.page_size;
        let inserted = page
            .into_iter()
            .filter(|m| self.insert_sorted(m.clone()))
            .count();

        self.loading_older = false;
        self.has_more = full_page;
        if inserted > 0 {
            self.restoring_scroll = true;
        }

        OlderPage {
            inserted,
            has_more: self.has_more,
            anchor,
        }
    }

    /// Abandons an in-flight older-page load without touching history.
    pub fn cancel_load_older(&mut self) {
        self.loading_older = false;
    }

    /// Feeds a viewport scroll into the history.
    pub fn record_scroll(&mut self, position: ScrollPosition) -> ScrollAction {
        if self.restoring_scroll {
            self.restoring_scroll = false;
            return ScrollAction::None;
        }

        self.anchored_at_bottom = position.at_bottom;

        if position.at_top && self.has_more && !self.loading_older {
            if let Some(before) = self.oldest_timestamp() {
                return ScrollAction::LoadOlder { before };
            }
        }
        ScrollAction::None
    }

    fn insert_sorted(&mut self, message: ChatMessage) -> bool {
        if self.ids.contains(&message.id) {
            return false;
        }
        let pos = self
            .messages
            .partition_point(|existing| existing.chronological_cmp(&message).is_lt());
        self.ids.insert(message.id.clone());
        self.messages.insert(pos, message);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::message::fixtures::message_at;
    use super::*;

    const ROOM: &str = "chat_user42";

    fn history(page_size: usize) -> RoomHistory {
        RoomHistory::new(RoomId::new(ROOM).unwrap(), page_size)
    }

    fn ids(h: &RoomHistory) -> Vec<&str> {
        h.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn initial_load_then_live_message_keeps_order_without_duplicates() {
        let mut h = history(10);
        h.apply_initial(vec![
            message_at(ROOM, "m-1", "10:00:00"),
            message_at(ROOM, "m-2", "10:01:00"),
            message_at(ROOM, "m-3", "10:05:00"),
        ]);

        let live = message_at(ROOM, "m-4", "10:06:00");
        assert!(h.append_live(live.clone()).appended);

        // Same message also arrives in a late history fetch.
        h.apply_initial(vec![live]);

        assert_eq!(ids(&h), vec!["m-1", "m-2", "m-3", "m-4"]);
    }

    #[test]
    fn duplicate_live_message_is_ignored() {
        let mut h = history(10);
        let msg = message_at(ROOM, "m-1", "10:00:00");

        assert!(h.append_live(msg.clone()).appended);
        let outcome = h.append_live(msg);
        assert!(!outcome.appended);
        assert!(!outcome.scroll_to_bottom);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn out_of_order_arrival_is_placed_by_timestamp() {
        let mut h = history(10);
        h.append_live(message_at(ROOM, "m-2", "10:05:00"));
        h.append_live(message_at(ROOM, "m-1", "10:00:00"));

        assert_eq!(ids(&h), vec!["m-1", "m-2"]);
    }

    #[test]
    fn live_message_scrolls_only_when_anchored_at_bottom() {
        let mut h = history(10);
        h.apply_initial(vec![message_at(ROOM, "m-1", "10:00:00")]);

        assert!(h.append_live(message_at(ROOM, "m-2", "10:01:00")).scroll_to_bottom);

        h.record_scroll(ScrollPosition::middle());
        let outcome = h.append_live(message_at(ROOM, "m-3", "10:02:00"));
        assert!(outcome.appended);
        assert!(!outcome.scroll_to_bottom);
    }

    #[test]
    fn resent_initial_page_keeps_reader_scrolled_up() {
        let mut h = history(10);
        let page = vec![
            message_at(ROOM, "m-1", "10:00:00"),
            message_at(ROOM, "m-2", "10:01:00"),
        ];
        h.apply_initial(page.clone());
        h.record_scroll(ScrollPosition::middle());

        assert_eq!(h.apply_initial(page), 0);
        assert!(!h.is_anchored_at_bottom());

        let outcome = h.append_live(message_at(ROOM, "m-3", "10:02:00"));
        assert!(outcome.appended);
        assert!(!outcome.scroll_to_bottom);
    }

    #[test]
    fn partial_initial_page_means_no_more_history() {
        let mut h = history(5);
        h.apply_initial(vec![
            message_at(ROOM, "m-1", "10:00:00"),
            message_at(ROOM, "m-2", "10:01:00"),
            message_at(ROOM, "m-3", "10:02:00"),
        ]);
        assert!(!h.has_more());
    }

    #[test]
    fn older_page_shorter_than_page_size_exhausts_history() {
        let mut h = history(5);
        h.apply_initial((0..5).map(|i| message_at(ROOM, &format!("m-5{}", i), &format!("10:1{}:00", i))).collect());
        assert!(h.has_more());

        assert!(h.begin_load_older().is_some());
        let page = h.finish_load_older(vec![
            message_at(ROOM, "m-01", "09:00:00"),
            message_at(ROOM, "m-02", "09:01:00"),
            message_at(ROOM, "m-03", "09:02:00"),
        ]);

        assert_eq!(page.inserted, 3);
        assert!(!page.has_more);
        assert!(!h.has_more());
    }

    #[test]
    fn full_older_page_leaves_more_history() {
        let mut h = history(2);
        h.apply_initial(vec![
            message_at(ROOM, "m-3", "10:00:00"),
            message_at(ROOM, "m-4", "10:01:00"),
        ]);

        h.begin_load_older();
        let page = h.finish_load_older(vec![
            message_at(ROOM, "m-1", "09:00:00"),
            message_at(ROOM, "m-2", "09:01:00"),
        ]);

        assert!(page.has_more);
        assert_eq!(page.anchor.as_ref().map(|id| id.as_str()), Some("m-3"));
        assert_eq!(ids(&h), vec!["m-1", "m-2", "m-3", "m-4"]);
    }

    #[test]
    fn begin_load_older_is_refused_while_in_flight() {
        let mut h = history(1);
        h.apply_initial(vec![message_at(ROOM, "m-2", "10:00:00")]);

        let cursor = h.begin_load_older();
        assert_eq!(cursor, h.oldest_timestamp());
        assert!(h.begin_load_older().is_none());

        h.cancel_load_older();
        assert!(h.begin_load_older().is_some());
    }

    #[test]
    fn begin_load_older_needs_a_cursor() {
        let mut h = history(10);
        assert!(h.begin_load_older().is_none());
        assert!(!h.is_loading_older());
    }

    #[test]
    fn scroll_to_top_requests_older_page() {
        let mut h = history(1);
        h.apply_initial(vec![message_at(ROOM, "m-2", "10:00:00")]);

        let action = h.record_scroll(ScrollPosition::top());
        assert_eq!(
            action,
            ScrollAction::LoadOlder {
                before: h.oldest_timestamp().unwrap()
            }
        );
    }

    #[test]
    fn restoration_scroll_after_prepend_does_not_trigger_another_load() {
        let mut h = history(1);
        h.apply_initial(vec![message_at(ROOM, "m-2", "10:00:00")]);

        h.begin_load_older();
        h.finish_load_older(vec![message_at(ROOM, "m-1", "09:00:00")]);

        // The view restores the anchor, which the UI reports as a scroll at the top.
        assert_eq!(h.record_scroll(ScrollPosition::top()), ScrollAction::None);

        // A genuine user scroll to the top afterwards does load again.
        assert!(matches!(
            h.record_scroll(ScrollPosition::top()),
            ScrollAction::LoadOlder { .. }
        ));
    }

    #[test]
    fn no_load_requested_once_history_is_exhausted() {
        let mut h = history(10);
        h.apply_initial(vec![message_at(ROOM, "m-1", "10:00:00")]);
        assert_eq!(h.record_scroll(ScrollPosition::top()), ScrollAction::None);
    }
}
