//! HTTP adapters for REST collaborators.

mod order_status_client;

pub use order_status_client::HttpOrderStatusApi;
