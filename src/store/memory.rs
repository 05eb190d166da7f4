//! In-memory snapshot backend.
//!
//! [`InMemoryBackend`] is a thread-safe [`SnapshotBackend`] over a
//! `DashMap<String, Vec<u8>>`. It is the default choice for tests and
//! for sessions that do not need durability across restarts.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::store::backend::{SnapshotBackend, StorageError};

/// Thread-safe in-memory snapshot backend.
///
/// A dumb byte sink: one entry per scope key, no interpretation of the
/// payload.
///
/// # Examples
///
/// ```
/// use respmatrix::store::memory::InMemoryBackend;
///
/// let backend = InMemoryBackend::new();
/// assert!(backend.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: DashMap<String, Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Returns the number of stored snapshots.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no snapshots are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl SnapshotBackend for InMemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_missing_key_returns_none() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.read("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let backend = InMemoryBackend::new();
        backend.write("key-1", b"payload").await.unwrap();
        assert_eq!(
            backend.read("key-1").await.unwrap(),
            Some(b"payload".to_vec())
        );
    }

    #[tokio::test]
    async fn write_overwrites() {
        let backend = InMemoryBackend::new();
        backend.write("key-1", b"first").await.unwrap();
        backend.write("key-1", b"second").await.unwrap();
        assert_eq!(
            backend.read("key-1").await.unwrap(),
            Some(b"second".to_vec())
        );
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn remove_existing_returns_true() {
        let backend = InMemoryBackend::new();
        backend.write("key-1", b"payload").await.unwrap();
        assert!(backend.remove("key-1").await.unwrap());
        assert_eq!(backend.read("key-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_missing_returns_false() {
        let backend = InMemoryBackend::new();
        assert!(!backend.remove("nonexistent").await.unwrap());
    }
}
