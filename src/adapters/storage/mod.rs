//! Storage Adapters
//!
//! Implementations of the UnreadCountStore port.
//!
//! ## Available Adapters
//!
//! - **FileUnreadCountStore** - Stores counts in a YAML file on disk
//! - **InMemoryUnreadCountStore** - Stores counts in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileUnreadCountStore, InMemoryUnreadCountStore};
//!
//! // Production: file-based storage
//! let store = FileUnreadCountStore::new("./data/unread_counts.yaml");
//!
//! // Testing: in-memory storage
//! let store = InMemoryUnreadCountStore::new();
//! ```

mod file_unread_store;
mod in_memory_unread_store;

pub use file_unread_store::FileUnreadCountStore;
pub use in_memory_unread_store::InMemoryUnreadCountStore;
