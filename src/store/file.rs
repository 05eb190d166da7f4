//! File-system snapshot backend.
//!
//! [`FileBackend`] persists each scope's snapshot as one file under a
//! root directory, giving sessions durability across process restarts.
//! File names are the hex encoding of the scope key, so arbitrary
//! project and user identifiers cannot escape the root or collide.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::store::backend::{SnapshotBackend, StorageError};

/// Snapshot backend storing one JSON file per scope key.
///
/// The root directory is created on the first write. Reads of a key
/// that has never been written report absence, not an error.
///
/// # Examples
///
/// ```
/// use respmatrix::store::file::FileBackend;
///
/// let backend = FileBackend::new("/var/lib/respmatrix");
/// assert!(backend.root().ends_with("respmatrix"));
/// ```
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Creates a backend rooted at `root`. The directory itself is
    /// created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory snapshots are stored under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() * 2 + 5);
        for byte in key.bytes() {
            let _ = write!(name, "{byte:02x}");
        }
        name.push_str(".json");
        self.root.join(name)
    }

    fn io_error(op: &str, err: std::io::Error) -> StorageError {
        StorageError::Backend {
            message: format!("{op} failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

#[async_trait]
impl SnapshotBackend for FileBackend {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error("read", e)),
        }
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::io_error("create_dir_all", e))?;
        tokio::fs::write(self.path_for(key), data)
            .await
            .map_err(|e| Self::io_error("write", e))
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error("remove", e)),
        }
    }
}
