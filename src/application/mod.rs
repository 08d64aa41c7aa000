//! Application layer - the real-time session and its collaborators.
//!
//! - `connection` - transport link lifecycle and the link task
//! - `dispatcher` - one handler per inbound event type
//! - `handlers` - inbound handlers bound on every connect
//! - `room_registry` - joined rooms, re-joined after a transport loss
//! - `message_store` - per-room history and persisted unread counters
//! - `notifier` - deduplicated notification fan-out
//! - `order_status` - order status transition engine
//! - `hub` - `AdminHub`, the session facade used by the UI layer

mod connection;
mod dispatcher;
mod error;
mod handlers;
mod hub;
mod message_store;
mod notifier;
mod order_status;
mod room_registry;

pub use connection::{ConnectionState, LinkEvent, TransportConnection};
pub use dispatcher::{EventDispatcher, InboundHandler};
pub use error::{ConnectionError, HubError};
pub use hub::AdminHub;
pub use message_store::{LoadOlderOutcome, LoadOlderTicket, MessageStore, OlderPageRequests};
pub use notifier::Notifier;
pub use order_status::{OrderStatusTransitionEngine, StatusOption};
pub use room_registry::{RoomListChanged, RoomRegistry};
