//! Low-level snapshot storage trait and supporting types.
//!
//! The [`SnapshotBackend`] trait is the persistence seam: three
//! operations over opaque byte payloads keyed by a scope key. Backends
//! are dumb sinks -- they never look inside a payload, never enforce
//! domain rules, and report failures as explicit [`StorageError`]s. The
//! *store* decides what a failure means (read failures degrade to seed
//! data; write failures are logged and swallowed).
//!
//! # Key structure
//!
//! Scope keys are `responsibility-matrix:{project_id}:{user_id}`,
//! produced by [`scope_key`]. The format is deterministic so the same
//! scope always maps to the same durable slot across restarts.

use async_trait::async_trait;
use thiserror::Error;

use crate::constants::SCOPE_KEY_PREFIX;

/// Errors that can occur during raw storage operations.
///
/// # Examples
///
/// ```
/// use respmatrix::store::backend::StorageError;
///
/// let err = StorageError::Unavailable { message: "storage disabled".to_string() };
/// assert!(err.to_string().contains("storage disabled"));
/// ```
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage medium refused the operation (disabled, read-only,
    /// quota exhausted).
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the refusal.
        message: String,
    },

    /// The backend has reached a capacity limit.
    #[error("capacity exceeded: {message}")]
    CapacityExceeded {
        /// Human-readable description of the capacity issue.
        message: String,
    },

    /// An I/O or backend-specific error occurred.
    #[error("backend error: {message}")]
    Backend {
        /// Human-readable description of the error.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Key-value backend for snapshot persistence.
///
/// One scope key holds one serialized snapshot. Implementations must be
/// `Send + Sync`; each call is a single attempt with no retries or
/// queuing -- error handling policy lives in the store, not here.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Retrieves the payload stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Any [`StorageError`] on failures that are *not* simple absence.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Stores `data` under `key`, overwriting any previous payload.
    ///
    /// # Errors
    ///
    /// - [`StorageError::CapacityExceeded`] if the backend is full.
    /// - [`StorageError::Unavailable`] / [`StorageError::Backend`] on
    ///   other failures.
    async fn write(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Deletes the payload under `key`.
    ///
    /// Returns `true` if a payload existed, `false` if the key was
    /// absent (idempotent delete).
    ///
    /// # Errors
    ///
    /// Any [`StorageError`] on I/O failures.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

#[async_trait]
impl<B: SnapshotBackend + ?Sized> SnapshotBackend for std::sync::Arc<B> {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(key, data).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key).await
    }
}

/// Constructs the scope key for a `(project_id, user_id)` pair.
///
/// # Examples
///
/// ```
/// use respmatrix::store::backend::scope_key;
///
/// assert_eq!(
///     scope_key("proj-2525", "user-55"),
///     "responsibility-matrix:proj-2525:user-55"
/// );
/// // Deterministic: same inputs, same key.
/// assert_eq!(scope_key("p", "u"), scope_key("p", "u"));
/// ```
pub fn scope_key(project_id: &str, user_id: &str) -> String {
    format!("{SCOPE_KEY_PREFIX}:{project_id}:{user_id}")
}
