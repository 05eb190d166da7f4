//! Error types for responsibility-matrix store operations.
//!
//! Provides [`MatrixError`], the domain-level error taxonomy. Low-level
//! backend failures are [`StorageError`](crate::store::backend::StorageError)
//! and are mapped into `MatrixError::Storage` at the store boundary --
//! except where the store deliberately swallows them (best-effort writes,
//! fallback-to-default reads).

use thiserror::Error;

use crate::store::backend::StorageError;

/// Errors that can occur during store operations.
///
/// Every variant has a defined local recovery: `NotFound` mutations are
/// no-ops the caller may ignore, `Decode` failures during initialization
/// fall back to the default snapshot, and `Storage` failures on writes
/// are logged and swallowed. Nothing in this crate panics on these.
///
/// # Examples
///
/// ```
/// use respmatrix::MatrixError;
///
/// let err = MatrixError::NotFound { task_id: "missing-task".to_string() };
/// assert!(err.to_string().contains("missing-task"));
/// assert!(!err.is_recoverable_as_default());
///
/// let err = MatrixError::Decode { reason: "truncated payload".to_string() };
/// assert!(err.is_recoverable_as_default());
/// ```
#[derive(Debug, Error)]
pub enum MatrixError {
    /// A mutation referenced a task id that is not in the collection.
    #[error("task not found: {task_id}")]
    NotFound {
        /// The task id that was not found.
        task_id: String,
    },

    /// A persisted snapshot was present but malformed or written by a
    /// newer version of this crate.
    #[error("snapshot decode failed: {reason}")]
    Decode {
        /// Human-readable description of what failed to parse.
        reason: String,
    },

    /// A backend storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl MatrixError {
    /// Returns `true` if this failure is recovered by falling back to the
    /// default snapshot (the policy applied during `initialize`).
    ///
    /// Decode failures and storage failures qualify; a `NotFound` from a
    /// targeted mutation does not.
    pub fn is_recoverable_as_default(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = MatrixError::NotFound {
            task_id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "task not found: abc");

        let err = MatrixError::Decode {
            reason: "missing field `tasks`".to_string(),
        };
        assert!(err.to_string().contains("missing field `tasks`"));
    }

    #[test]
    fn storage_error_converts() {
        let err: MatrixError = StorageError::Unavailable {
            message: "quota exceeded".to_string(),
        }
        .into();
        assert!(matches!(err, MatrixError::Storage(_)));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn recovery_classification() {
        assert!(MatrixError::Decode {
            reason: "bad".to_string()
        }
        .is_recoverable_as_default());
        assert!(!MatrixError::NotFound {
            task_id: "t".to_string()
        }
        .is_recoverable_as_default());
    }
}
