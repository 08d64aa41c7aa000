//! Local persistence configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Where durable client-side state lives
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// YAML file holding per-room unread counts
    #[serde(default = "default_unread_counts_path")]
    pub unread_counts_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            unread_counts_path: default_unread_counts_path(),
        }
    }
}

fn default_unread_counts_path() -> PathBuf {
    PathBuf::from("./data/unread_counts.yaml")
}
