//! Support chat: rooms, messages, per-room history and unread counters.

mod history;
mod message;
mod room;
mod unread;

pub use history::{AppendOutcome, OlderPage, RoomHistory, ScrollAction, ScrollPosition};
pub use message::{ChatMessage, OrderReference, SenderRole};
pub use room::{RoomId, RoomSummary};
pub use unread::UnreadCounters;

#[cfg(test)]
pub(crate) use message::fixtures;
