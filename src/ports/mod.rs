//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the hub and the outside world. Adapters implement these ports.
//!
//! - `Transport` / `TransportConnector` - Persistent bidirectional link to the messaging backend
//! - `UnreadCountStore` - Durable per-room unread counters
//! - `OrderStatusApi` - REST collaborator for order status transitions

mod order_status_api;
mod transport;
mod unread_store;

pub use order_status_api::{OrderStatusApi, OrderStatusApiError, TransitionOptions};
pub use transport::{Transport, TransportConnector, TransportError};
pub use unread_store::{UnreadCountStore, UnreadStoreError};
