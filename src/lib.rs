//! Scoped, snapshot-persisted store for project responsibility-matrix
//! tasks.
//!
//! A *scope* is one `(project_id, user_id)` pair; each scope owns an
//! independent collection of [`MatrixTask`](domain::MatrixTask) records
//! plus co-persisted view state. The crate layers:
//!
//! - [`store::backend`] -- the [`SnapshotBackend`](store::SnapshotBackend)
//!   trait: a dumb byte-level key-value seam, with in-memory
//!   ([`store::memory`]) and file-system ([`store::file`]) backends.
//! - [`snapshot`] -- the versioned JSON envelope and its lenient codec.
//! - [`store::scoped`] -- [`MatrixStore`](store::MatrixStore), the state
//!   machine: restore-or-seed initialization, serialized mutations with
//!   best-effort persistence, single-primary assignment enforcement,
//!   change notification, and memoized [`MatrixMetrics`].
//! - [`registry`] -- a bounded per-process cache handing out one shared
//!   store per scope.
//!
//! Persistence never gates correctness: write failures are logged and
//! the in-memory state stays authoritative, and unreadable or missing
//! snapshots degrade to seed data.
//!
//! # Examples
//!
//! ```
//! use respmatrix::domain::{sample_seed, AssignmentState, TaskDraft};
//! use respmatrix::store::memory::InMemoryBackend;
//! use respmatrix::store::MatrixStore;
//! use respmatrix::TaskStatus;
//!
//! # tokio_test::block_on(async {
//! let store = MatrixStore::new(InMemoryBackend::new(), "proj-2525", "user-55", sample_seed());
//! store.initialize().await;
//!
//! let id = store
//!     .add_task(TaskDraft {
//!         task_type: "team".to_string(),
//!         category: "PM3".to_string(),
//!         task: "Review three-week lookahead".to_string(),
//!         ..Default::default()
//!     })
//!     .await;
//! store
//!     .update_assignment(&id, "PM3", AssignmentState::Primary)
//!     .await?;
//! store.update_status(&id, TaskStatus::Completed).await?;
//!
//! let metrics = store.metrics().await;
//! assert_eq!(metrics.total_tasks, 4);
//! assert_eq!(metrics.role_workload["PM3"], 1);
//! # Ok::<(), respmatrix::MatrixError>(())
//! # }).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod snapshot;
pub mod store;

pub use domain::{AssignmentState, MatrixTask, TaskDraft, TaskStatus};
pub use error::MatrixError;
pub use metrics::MatrixMetrics;
pub use registry::StoreRegistry;
pub use snapshot::{MatrixSnapshot, MatrixTab};
pub use store::{MatrixStore, SnapshotBackend, StorageError, StoreEvent};
