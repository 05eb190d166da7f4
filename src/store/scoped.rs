//! The scoped store: per-`(project_id, user_id)` state machine.
//!
//! [`MatrixStore`] owns one scope's task collection behind a
//! `tokio::sync::RwLock`. Every mutating operation takes the write lock
//! across the whole mutate-encode-persist sequence, so mutations within
//! a scope are serialized and each persisted snapshot reflects exactly
//! one mutation's outcome.
//!
//! Persistence is best-effort: a failed write is logged and swallowed,
//! and the in-memory state stays authoritative. Restore failures degrade
//! to seed data. The only errors surfaced to callers are domain errors
//! such as [`MatrixError::NotFound`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::{AssignmentState, MatrixTask, SeedTask, TaskDraft, TaskStatus};
use crate::error::MatrixError;
use crate::metrics::MatrixMetrics;
use crate::snapshot::{self, MatrixSnapshot, MatrixTab};
use crate::store::backend::{scope_key, SnapshotBackend};

/// Change notification delivered to subscribers after a mutation has
/// been applied (and its persistence attempted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// State was loaded (or defaulted) by [`MatrixStore::initialize`].
    Initialized,
    /// The active view tab changed.
    TabChanged(MatrixTab),
    /// A task was added to the collection.
    TaskAdded {
        /// Id of the new task.
        task_id: String,
    },
    /// An existing task was modified.
    TaskUpdated {
        /// Id of the modified task.
        task_id: String,
    },
    /// A task was removed from the collection.
    TaskRemoved {
        /// Id of the removed task.
        task_id: String,
    },
    /// The scope was reset to its seed collection.
    Reset,
}

/// Handle returned by [`MatrixStore::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// Mutable state of one scope, guarded by the store's lock.
struct MatrixState {
    tasks: Vec<MatrixTask>,
    active_tab: MatrixTab,
    last_updated: DateTime<Utc>,
    /// Bumped whenever `tasks` changes; keys the metrics memo.
    collection_rev: u64,
    metrics_cache: Option<(u64, Arc<MatrixMetrics>)>,
}

impl MatrixState {
    fn from_snapshot(snap: MatrixSnapshot) -> Self {
        Self {
            tasks: snap.tasks,
            active_tab: snap.active_tab,
            last_updated: snap.last_updated,
            collection_rev: 0,
            metrics_cache: None,
        }
    }

    fn install(&mut self, snap: MatrixSnapshot) {
        self.tasks = snap.tasks;
        self.active_tab = snap.active_tab;
        self.last_updated = snap.last_updated;
        self.collection_rev += 1;
        self.metrics_cache = None;
    }

    fn to_snapshot(&self) -> MatrixSnapshot {
        MatrixSnapshot {
            version: crate::constants::SNAPSHOT_VERSION,
            tasks: self.tasks.clone(),
            active_tab: self.active_tab,
            last_updated: self.last_updated,
        }
    }
}

/// Store for one `(project_id, user_id)` scope over a snapshot backend.
///
/// Construct with [`MatrixStore::new`], then call
/// [`initialize`](MatrixStore::initialize) to restore persisted state.
/// All mutating operations persist the full snapshot before returning;
/// persistence failures never fail the operation.
///
/// # Examples
///
/// ```
/// use respmatrix::domain::{sample_seed, AssignmentState, TaskDraft};
/// use respmatrix::store::memory::InMemoryBackend;
/// use respmatrix::store::scoped::MatrixStore;
///
/// # tokio_test::block_on(async {
/// let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
/// store.initialize().await;
/// assert_eq!(store.tasks().await.len(), 3);
///
/// let id = store
///     .add_task(TaskDraft {
///         task_type: "team".to_string(),
///         category: "PM3".to_string(),
///         task: "Weekly schedule review".to_string(),
///         ..Default::default()
///     })
///     .await;
/// store
///     .update_assignment(&id, "PM3", AssignmentState::Primary)
///     .await
///     .unwrap();
/// assert_eq!(store.task(&id).await.unwrap().responsible, "PM3");
/// # });
/// ```
pub struct MatrixStore<B: SnapshotBackend> {
    backend: B,
    project_id: String,
    user_id: String,
    key: String,
    seed: Vec<SeedTask>,
    state: RwLock<MatrixState>,
    subscribers: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl<B: SnapshotBackend> MatrixStore<B> {
    /// Creates a store for the given scope.
    ///
    /// The store starts from seed data; call
    /// [`initialize`](MatrixStore::initialize) to restore any persisted
    /// snapshot.
    pub fn new(backend: B, project_id: &str, user_id: &str, seed: Vec<SeedTask>) -> Self {
        let initial = snapshot::default_snapshot(project_id, &seed);
        Self {
            backend,
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            key: scope_key(project_id, user_id),
            seed,
            state: RwLock::new(MatrixState::from_snapshot(initial)),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// The project half of this store's scope.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// The user half of this store's scope.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The backend this store persists through.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ---- lifecycle ----

    /// Loads state from the backend, falling back to seed data.
    ///
    /// Infallible by design: a missing snapshot, a decode failure, or a
    /// storage read failure all degrade to the seed collection (with a
    /// warning for the failure cases). When falling back, the seed
    /// snapshot is persisted so a later `initialize` restores the same
    /// state, ids included.
    pub async fn initialize(&self) {
        let restored = match self.backend.read(&self.key).await {
            Ok(Some(raw)) => match snapshot::decode(&raw) {
                Ok(snap) => Some(snap),
                Err(e) => {
                    warn!(key = %self.key, error = %e, "stored snapshot unreadable, falling back to seed data");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "snapshot read failed, falling back to seed data");
                None
            }
        };

        let mut state = self.state.write().await;
        match restored {
            Some(snap) => {
                debug!(key = %self.key, tasks = snap.tasks.len(), "restored snapshot");
                state.install(snap);
            }
            None => {
                let snap = snapshot::default_snapshot(&self.project_id, &self.seed);
                state.install(snap);
                self.persist(&state).await;
            }
        }
        drop(state);

        self.notify(&StoreEvent::Initialized);
    }

    /// Discards the current collection and reinstalls seed data.
    ///
    /// Unlike a failed restore, this is an explicit mutation: the fresh
    /// snapshot is persisted immediately.
    pub async fn reset_to_default(&self) {
        let mut state = self.state.write().await;
        let snap = snapshot::default_snapshot(&self.project_id, &self.seed);
        state.install(snap);
        self.persist(&state).await;
        drop(state);

        self.notify(&StoreEvent::Reset);
    }

    // ---- mutations ----

    /// Switches the active view tab and persists.
    ///
    /// The tab is UI state, not collection state, so this does not
    /// invalidate memoized metrics.
    pub async fn set_active_tab(&self, tab: MatrixTab) {
        let mut state = self.state.write().await;
        if state.active_tab == tab {
            return;
        }
        state.active_tab = tab;
        state.last_updated = Utc::now();
        self.persist(&state).await;
        drop(state);

        self.notify(&StoreEvent::TabChanged(tab));
    }

    /// Creates a task from `draft` and appends it to the collection.
    ///
    /// Returns the generated task id.
    pub async fn add_task(&self, draft: TaskDraft) -> String {
        let mut state = self.state.write().await;
        let task = draft.into_task(&self.project_id);
        let task_id = task.id.clone();
        state.tasks.push(task);
        self.commit(&mut state).await;
        drop(state);

        self.notify(&StoreEvent::TaskAdded {
            task_id: task_id.clone(),
        });
        task_id
    }

    /// Sets one role's assignment state on a task.
    ///
    /// Single-primary enforcement happens inside the record mutation;
    /// see [`MatrixTask::set_assignment`].
    ///
    /// # Errors
    ///
    /// [`MatrixError::NotFound`] if no task has `task_id`; state and
    /// storage are untouched in that case.
    pub async fn update_assignment(
        &self,
        task_id: &str,
        role: &str,
        assignment: AssignmentState,
    ) -> Result<(), MatrixError> {
        self.mutate_task(task_id, |task| task.set_assignment(role, assignment))
            .await
    }

    /// Sets a task's lifecycle status.
    ///
    /// # Errors
    ///
    /// [`MatrixError::NotFound`] if no task has `task_id`.
    pub async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<(), MatrixError> {
        self.mutate_task(task_id, |task| task.set_status(status))
            .await
    }

    /// Replaces a task's classification tag.
    ///
    /// # Errors
    ///
    /// [`MatrixError::NotFound`] if no task has `task_id`.
    pub async fn update_category(&self, task_id: &str, category: &str) -> Result<(), MatrixError> {
        self.mutate_task(task_id, |task| task.set_category(category))
            .await
    }

    /// Appends a free-text note to a task.
    ///
    /// # Errors
    ///
    /// [`MatrixError::NotFound`] if no task has `task_id`.
    pub async fn add_annotation(&self, task_id: &str, note: &str) -> Result<(), MatrixError> {
        self.mutate_task(task_id, |task| task.add_annotation(note))
            .await
    }

    /// Removes a task by id.
    ///
    /// Returns `true` if a task was removed. Removing an absent id is
    /// a no-op returning `false`, with nothing persisted.
    pub async fn remove_task(&self, task_id: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(index) = state.tasks.iter().position(|t| t.id == task_id) else {
            debug!(task_id, "remove_task: id not present");
            return false;
        };
        state.tasks.remove(index);
        self.commit(&mut state).await;
        drop(state);

        self.notify(&StoreEvent::TaskRemoved {
            task_id: task_id.to_string(),
        });
        true
    }

    // ---- reads ----

    /// Returns a copy of the current task collection, in insertion order.
    pub async fn tasks(&self) -> Vec<MatrixTask> {
        self.state.read().await.tasks.clone()
    }

    /// Looks up one task by id.
    pub async fn task(&self, task_id: &str) -> Option<MatrixTask> {
        self.state
            .read()
            .await
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    /// Returns the active view tab.
    pub async fn active_tab(&self) -> MatrixTab {
        self.state.read().await.active_tab
    }

    /// Returns when this scope's state last changed.
    pub async fn last_updated(&self) -> DateTime<Utc> {
        self.state.read().await.last_updated
    }

    /// Returns the current state as a snapshot envelope.
    pub async fn snapshot(&self) -> MatrixSnapshot {
        self.state.read().await.to_snapshot()
    }

    /// Returns aggregate metrics for the current collection.
    ///
    /// Memoized against the collection revision: between mutations,
    /// repeated calls return the same `Arc` without recomputation.
    pub async fn metrics(&self) -> Arc<MatrixMetrics> {
        {
            let state = self.state.read().await;
            if let Some((rev, cached)) = &state.metrics_cache {
                if *rev == state.collection_rev {
                    return Arc::clone(cached);
                }
            }
        }

        let mut state = self.state.write().await;
        // Another caller may have filled the cache while we re-locked.
        if let Some((rev, cached)) = &state.metrics_cache {
            if *rev == state.collection_rev {
                return Arc::clone(cached);
            }
        }
        let computed = Arc::new(MatrixMetrics::compute(&state.tasks));
        state.metrics_cache = Some((state.collection_rev, Arc::clone(&computed)));
        computed
    }

    // ---- subscriptions ----

    /// Registers a listener called after every applied mutation.
    ///
    /// Listeners run synchronously on the mutating call path, after the
    /// state change and persistence attempt, outside the state lock.
    pub fn subscribe(&self, listener: impl Fn(&StoreEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if the id was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    fn notify(&self, event: &StoreEvent) {
        for (_, listener) in self.subscribers.lock().iter() {
            listener(event);
        }
    }

    // ---- internals ----

    /// Applies `mutate` to the task with `task_id`, then commits.
    async fn mutate_task(
        &self,
        task_id: &str,
        mutate: impl FnOnce(&mut MatrixTask),
    ) -> Result<(), MatrixError> {
        let mut state = self.state.write().await;
        let Some(task) = state.tasks.iter_mut().find(|t| t.id == task_id) else {
            drop(state);
            warn!(task_id, "mutation targeted a task that does not exist");
            return Err(MatrixError::NotFound {
                task_id: task_id.to_string(),
            });
        };
        mutate(task);
        self.commit(&mut state).await;
        drop(state);

        self.notify(&StoreEvent::TaskUpdated {
            task_id: task_id.to_string(),
        });
        Ok(())
    }

    /// Marks the collection changed and persists, while the write lock
    /// is held.
    async fn commit(&self, state: &mut MatrixState) {
        state.collection_rev += 1;
        state.metrics_cache = None;
        state.last_updated = Utc::now();
        self.persist(state).await;
    }

    /// Best-effort snapshot write. Failures are logged and swallowed;
    /// the in-memory state remains authoritative.
    async fn persist(&self, state: &MatrixState) {
        let snap = state.to_snapshot();
        match snapshot::encode(&snap) {
            Ok(bytes) => {
                if let Err(e) = self.backend.write(&self.key, &bytes).await {
                    warn!(key = %self.key, error = %e, "snapshot write failed, continuing with in-memory state");
                }
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "snapshot encode failed, nothing persisted");
            }
        }
    }
}

impl<B: SnapshotBackend + std::fmt::Debug> std::fmt::Debug for MatrixStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixStore")
            .field("backend", &self.backend)
            .field("project_id", &self.project_id)
            .field("user_id", &self.user_id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
