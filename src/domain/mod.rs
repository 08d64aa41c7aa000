//! Domain layer containing the hub's rules and types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine trait)
//! - `chat` - Rooms, messages, history pagination and unread counters
//! - `notification` - Notification events and time-window deduplication
//! - `order` - Order statuses and the transition graph

pub mod chat;
pub mod foundation;
pub mod notification;
pub mod order;
