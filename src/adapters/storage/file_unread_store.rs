//! File-based Unread Count Store Adapter
//!
//! Keeps the room → unread count map in a single YAML file. Writes go to a
//! sibling temp file first and are renamed into place, so a crash mid-write
//! leaves the previous counts intact.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::chat::RoomId;
use crate::ports::{UnreadCountStore, UnreadStoreError};

/// YAML file storage for unread counters
#[derive(Debug, Clone)]
pub struct FileUnreadCountStore {
    path: PathBuf,
}

impl FileUnreadCountStore {
    /// Create a store backed by the file at `path`
    ///
    /// # Example
    /// ```ignore
    /// let store = FileUnreadCountStore::new("./data/unread_counts.yaml");
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("yaml.tmp")
    }

    async fn ensure_parent_dir(&self) -> Result<(), UnreadStoreError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .await
                .map_err(|e| UnreadStoreError::IoError(e.to_string())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl UnreadCountStore for FileUnreadCountStore {
    async fn load(&self) -> Result<HashMap<RoomId, u32>, UnreadStoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let yaml = fs::read_to_string(&self.path)
            .await
            .map_err(|e| UnreadStoreError::IoError(e.to_string()))?;

        if yaml.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_yaml::from_str(&yaml)
            .map_err(|e| UnreadStoreError::DeserializationFailed(e.to_string()))
    }

    async fn save(&self, counts: &HashMap<RoomId, u32>) -> Result<(), UnreadStoreError> {
        self.ensure_parent_dir().await?;

        // Sorted so the file diffs cleanly between writes.
        let sorted: BTreeMap<&RoomId, &u32> = counts.iter().collect();
        let yaml = serde_yaml::to_string(&sorted)
            .map_err(|e| UnreadStoreError::SerializationFailed(e.to_string()))?;

        let temp_path = self.temp_path();
        fs::write(&temp_path, yaml)
            .await
            .map_err(|e| UnreadStoreError::IoError(e.to_string()))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| UnreadStoreError::IoError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn room(name: &str) -> RoomId {
        RoomId::new(name).unwrap()
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileUnreadCountStore::new(temp_dir.path().join("unread.yaml"));

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_survives_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("unread.yaml");

        let mut counts = HashMap::new();
        counts.insert(room("chat_user42"), 3);
        counts.insert(room("chat_user7"), 0);
        FileUnreadCountStore::new(&path).save(&counts).await.unwrap();

        let reloaded = FileUnreadCountStore::new(&path).load().await.unwrap();
        assert_eq!(reloaded, counts);
    }

    #[tokio::test]
    async fn save_replaces_previous_contents() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileUnreadCountStore::new(temp_dir.path().join("unread.yaml"));

        let mut first = HashMap::new();
        first.insert(room("chat_a"), 1);
        store.save(&first).await.unwrap();

        let mut second = HashMap::new();
        second.insert(room("chat_b"), 2);
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await.unwrap(), second);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_deserialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("unread.yaml");
        std::fs::write(&path, "chat_a: [not, a, number]\n").unwrap();

        let result = FileUnreadCountStore::new(&path).load().await;
        assert!(matches!(result, Err(UnreadStoreError::DeserializationFailed(_))));
    }
}
