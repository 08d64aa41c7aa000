//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the hub to external systems:
//! - `websocket` - Transport to the messaging backend (tokio-tungstenite)
//! - `http` - Order service REST client (reqwest)
//! - `storage` - Unread count persistence (YAML file, in-memory)
//! - `channel` - In-process transport for tests and demos

pub mod channel;
pub mod http;
pub mod storage;
pub mod websocket;

pub use channel::{ChannelConnector, ServerSession};
pub use http::HttpOrderStatusApi;
pub use storage::{FileUnreadCountStore, InMemoryUnreadCountStore};
pub use websocket::{InboundEvent, InboundEventType, OutboundCommand, WebSocketConnector};
