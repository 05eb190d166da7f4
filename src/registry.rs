//! Bounded registry of live stores.
//!
//! [`StoreRegistry`] hands out one shared [`MatrixStore`] per scope so
//! every caller in the process observes the same in-memory state. The
//! registry is bounded: when the number of live stores exceeds its
//! capacity, the least recently used store is dropped. Evicted scopes
//! lose nothing durable -- their next access restores from the backend.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::domain::SeedTask;
use crate::store::backend::{scope_key, SnapshotBackend};
use crate::store::scoped::MatrixStore;

/// Default number of live stores kept before eviction.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 64;

struct RegistryInner<B: SnapshotBackend> {
    stores: HashMap<String, Arc<MatrixStore<Arc<B>>>>,
    /// Scope keys ordered oldest-access first.
    recency: VecDeque<String>,
}

/// Per-process cache of initialized stores, keyed by scope key.
///
/// All stores share one backend and one seed collection.
///
/// # Examples
///
/// ```
/// use respmatrix::domain::sample_seed;
/// use respmatrix::registry::StoreRegistry;
/// use respmatrix::store::memory::InMemoryBackend;
///
/// # tokio_test::block_on(async {
/// let registry = StoreRegistry::new(InMemoryBackend::new(), sample_seed());
/// let a = registry.get_or_create("proj-1", "user-1").await;
/// let b = registry.get_or_create("proj-1", "user-1").await;
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// # });
/// ```
pub struct StoreRegistry<B: SnapshotBackend> {
    backend: Arc<B>,
    seed: Vec<SeedTask>,
    capacity: usize,
    inner: Mutex<RegistryInner<B>>,
}

impl<B: SnapshotBackend> StoreRegistry<B> {
    /// Creates a registry with [`DEFAULT_REGISTRY_CAPACITY`].
    pub fn new(backend: B, seed: Vec<SeedTask>) -> Self {
        Self::with_capacity(backend, seed, DEFAULT_REGISTRY_CAPACITY)
    }

    /// Creates a registry that keeps at most `capacity` live stores.
    /// A capacity of zero is treated as one.
    pub fn with_capacity(backend: B, seed: Vec<SeedTask>, capacity: usize) -> Self {
        Self {
            backend: Arc::new(backend),
            seed,
            capacity: capacity.max(1),
            inner: Mutex::new(RegistryInner {
                stores: HashMap::new(),
                recency: VecDeque::new(),
            }),
        }
    }

    /// Returns the store for a scope, creating and initializing it on
    /// first access.
    ///
    /// Repeated calls for the same scope return clones of the same
    /// `Arc` for as long as the store stays resident. An access marks
    /// the scope most recently used.
    pub async fn get_or_create(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Arc<MatrixStore<Arc<B>>> {
        let key = scope_key(project_id, user_id);

        if let Some(existing) = self.lookup(&key) {
            return existing;
        }

        // Build and restore outside the registry lock; initialization
        // does backend I/O.
        let store = Arc::new(MatrixStore::new(
            Arc::clone(&self.backend),
            project_id,
            user_id,
            self.seed.clone(),
        ));
        store.initialize().await;

        let mut inner = self.inner.lock();
        // A concurrent caller may have inserted the same scope while we
        // were initializing; keep theirs so the scope stays singular.
        if let Some(existing) = inner.stores.get(&key) {
            let existing = Arc::clone(existing);
            Self::touch(&mut inner.recency, &key);
            return existing;
        }

        inner.stores.insert(key.clone(), Arc::clone(&store));
        inner.recency.push_back(key);

        while inner.stores.len() > self.capacity {
            if let Some(oldest) = inner.recency.pop_front() {
                inner.stores.remove(&oldest);
                debug!(key = %oldest, "evicted least recently used store");
            }
        }

        store
    }

    /// Returns the resident store for a scope without creating one.
    pub fn get(&self, project_id: &str, user_id: &str) -> Option<Arc<MatrixStore<Arc<B>>>> {
        self.lookup(&scope_key(project_id, user_id))
    }

    /// Drops a scope's store from the registry. Durable state is
    /// untouched. Returns `true` if a store was resident.
    pub fn evict(&self, project_id: &str, user_id: &str) -> bool {
        let key = scope_key(project_id, user_id);
        let mut inner = self.inner.lock();
        inner.recency.retain(|k| *k != key);
        inner.stores.remove(&key).is_some()
    }

    /// Number of stores currently resident.
    pub fn len(&self) -> usize {
        self.inner.lock().stores.len()
    }

    /// Returns `true` if no store is resident.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().stores.is_empty()
    }

    fn lookup(&self, key: &str) -> Option<Arc<MatrixStore<Arc<B>>>> {
        let mut inner = self.inner.lock();
        let found = inner.stores.get(key).map(Arc::clone);
        if found.is_some() {
            Self::touch(&mut inner.recency, key);
        }
        found
    }

    fn touch(recency: &mut VecDeque<String>, key: &str) {
        if let Some(pos) = recency.iter().position(|k| k == key) {
            if let Some(k) = recency.remove(pos) {
                recency.push_back(k);
            }
        }
    }
}
