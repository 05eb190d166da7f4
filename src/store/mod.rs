//! Storage layers: backend trait, backends, and the scoped store.
//!
//! The split mirrors the persistence seam of the crate: backends
//! ([`memory::InMemoryBackend`], [`file::FileBackend`]) move opaque
//! bytes, and [`scoped::MatrixStore`] layers all domain behavior --
//! restore-or-seed, mutation serialization, best-effort persistence,
//! metrics memoization, and change notification -- on top of any
//! [`SnapshotBackend`].

pub mod backend;
pub mod file;
pub mod memory;
pub mod scoped;

pub use backend::{scope_key, SnapshotBackend, StorageError};
pub use scoped::{MatrixStore, StoreEvent, SubscriptionId};
