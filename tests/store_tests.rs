//! End-to-end store behavior over real backends, including degraded
//! storage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use respmatrix::domain::{sample_seed, SeedTask};
use respmatrix::store::backend::{SnapshotBackend, StorageError};
use respmatrix::store::memory::InMemoryBackend;
use respmatrix::store::{MatrixStore, StoreEvent};
use respmatrix::{AssignmentState, MatrixError, MatrixTab, TaskDraft, TaskStatus};

/// Backend whose read and write paths can be independently broken.
#[derive(Default)]
struct FlakyBackend {
    inner: InMemoryBackend,
    fail_reads: bool,
    fail_writes: bool,
    write_attempts: AtomicUsize,
}

impl FlakyBackend {
    fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl SnapshotBackend for FlakyBackend {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Unavailable {
                message: "reads disabled".to_string(),
            });
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StorageError::CapacityExceeded {
                message: "quota exhausted".to_string(),
            });
        }
        self.inner.write(key, data).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.remove(key).await
    }
}

fn draft(category: &str, task: &str) -> TaskDraft {
    TaskDraft {
        task_type: "team".to_string(),
        category: category.to_string(),
        task: task.to_string(),
        ..Default::default()
    }
}

// ---- initialization ----

#[tokio::test]
async fn empty_backend_initializes_to_seed_collection() {
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
    store.initialize().await;

    let tasks = store.tasks().await;
    assert_eq!(tasks.len(), 3);
    let categories: Vec<&str> = tasks.iter().map(|t| t.category.as_str()).collect();
    assert_eq!(categories, vec!["PX", "PM3", "APM"]);
    assert_eq!(store.active_tab().await, MatrixTab::Team);
}

#[tokio::test]
async fn repeated_initialize_yields_identical_state() {
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
    store.initialize().await;
    let first = store.snapshot().await;
    store.initialize().await;
    assert_eq!(store.snapshot().await, first);
}

#[tokio::test]
async fn corrupt_snapshot_falls_back_to_seed() {
    let backend = Arc::new(InMemoryBackend::new());
    let key = respmatrix::store::scope_key("proj-1", "user-1");
    backend.write(&key, b"{ not json").await.unwrap();

    let store = MatrixStore::new(Arc::clone(&backend), "proj-1", "user-1", sample_seed());
    store.initialize().await;
    assert_eq!(store.tasks().await.len(), 3);

    // The fallback was persisted over the corrupt payload.
    let repaired = backend.read(&key).await.unwrap().unwrap();
    assert!(serde_json::from_slice::<serde_json::Value>(&repaired).is_ok());
}

// ---- persistence round trip ----

#[tokio::test]
async fn mutations_survive_store_reconstruction() {
    let backend = Arc::new(InMemoryBackend::new());

    let store = MatrixStore::new(Arc::clone(&backend), "proj-1", "user-1", sample_seed());
    store.initialize().await;
    let id = store.add_task(draft("QAM", "Punch list walk")).await;
    store
        .update_assignment(&id, "QAM", AssignmentState::Primary)
        .await
        .unwrap();
    store.update_status(&id, TaskStatus::Completed).await.unwrap();
    store.add_annotation(&id, "walk scheduled").await.unwrap();
    store.set_active_tab(MatrixTab::Subcontract).await;
    let before = store.snapshot().await;
    drop(store);

    let reopened = MatrixStore::new(backend, "proj-1", "user-1", sample_seed());
    reopened.initialize().await;
    assert_eq!(reopened.snapshot().await, before);

    let restored = reopened.task(&id).await.unwrap();
    assert_eq!(restored.responsible, "QAM");
    assert_eq!(restored.annotations, vec!["walk scheduled"]);
    assert!(restored.status.is_completed());
}

#[tokio::test]
async fn scopes_are_isolated() {
    let backend = Arc::new(InMemoryBackend::new());

    let alice = MatrixStore::new(Arc::clone(&backend), "proj-1", "alice", sample_seed());
    let bob = MatrixStore::new(Arc::clone(&backend), "proj-1", "bob", sample_seed());
    alice.initialize().await;
    bob.initialize().await;

    alice.add_task(draft("PX", "Owner briefing")).await;
    assert_eq!(alice.tasks().await.len(), 4);
    assert_eq!(bob.tasks().await.len(), 3);

    let alice_ids: Vec<String> = alice.tasks().await.iter().map(|t| t.id.clone()).collect();
    for task in bob.tasks().await {
        assert!(!alice_ids.contains(&task.id));
    }
}

// ---- single-primary invariant ----

#[tokio::test]
async fn at_most_one_primary_per_task() {
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
    store.initialize().await;
    let id = store.tasks().await[0].id.clone();

    store
        .update_assignment(&id, "PM1", AssignmentState::Primary)
        .await
        .unwrap();
    store
        .update_assignment(&id, "PM2", AssignmentState::Primary)
        .await
        .unwrap();
    store
        .update_assignment(&id, "APM", AssignmentState::Support)
        .await
        .unwrap();

    let task = store.task(&id).await.unwrap();
    assert_eq!(task.responsible, "PM2");
    assert_eq!(task.assignments["PM1"], AssignmentState::Support);
    let primaries = task
        .assignments
        .values()
        .filter(|s| **s == AssignmentState::Primary)
        .count();
    assert_eq!(primaries, 1);
}

#[tokio::test]
async fn demoting_the_lead_clears_responsible() {
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
    store.initialize().await;
    let id = store.tasks().await[0].id.clone();

    store
        .update_assignment(&id, "PM3", AssignmentState::Primary)
        .await
        .unwrap();
    store
        .update_assignment(&id, "PM3", AssignmentState::None)
        .await
        .unwrap();

    let task = store.task(&id).await.unwrap();
    assert_eq!(task.responsible, "");
    assert_eq!(task.primary_role(), None);
}

// ---- missing-id mutations ----

#[tokio::test]
async fn mutations_on_missing_id_leave_state_untouched() {
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
    store.initialize().await;
    let before = store.snapshot().await;

    let result = store
        .update_assignment("ghost", "PX", AssignmentState::Primary)
        .await;
    assert!(matches!(result, Err(MatrixError::NotFound { .. })));
    let result = store.update_status("ghost", TaskStatus::Completed).await;
    assert!(matches!(result, Err(MatrixError::NotFound { .. })));
    let result = store.update_category("ghost", "PX").await;
    assert!(matches!(result, Err(MatrixError::NotFound { .. })));
    let result = store.add_annotation("ghost", "note").await;
    assert!(matches!(result, Err(MatrixError::NotFound { .. })));
    assert!(!store.remove_task("ghost").await);

    assert_eq!(store.snapshot().await, before);
}

// ---- degraded storage ----

#[tokio::test]
async fn write_failures_do_not_fail_mutations() {
    let store = MatrixStore::new(
        FlakyBackend::failing_writes(),
        "proj-1",
        "user-1",
        sample_seed(),
    );
    store.initialize().await;

    let id = store.add_task(draft("APM", "Daily report recap")).await;
    store.update_status(&id, TaskStatus::Pending).await.unwrap();
    assert!(store.remove_task(&id).await);

    assert_eq!(store.tasks().await.len(), 3);
    // Every mutation (and the seed fallback) attempted a write.
    assert!(store.backend().write_attempts.load(Ordering::SeqCst) >= 4);
}

#[tokio::test]
async fn read_failures_degrade_to_seed() {
    let store = MatrixStore::new(
        FlakyBackend::failing_reads(),
        "proj-1",
        "user-1",
        sample_seed(),
    );
    store.initialize().await;
    assert_eq!(store.tasks().await.len(), 3);

    // The store remains fully usable afterwards.
    let id = store.add_task(draft("PM1", "Change order log")).await;
    assert!(store.task(&id).await.is_some());
}

// ---- metrics ----

#[tokio::test]
async fn metrics_match_worked_scenario() {
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
    store.initialize().await;
    let ids: Vec<String> = store.tasks().await.iter().map(|t| t.id.clone()).collect();

    store
        .update_assignment(&ids[0], "PX", AssignmentState::Primary)
        .await
        .unwrap();
    store
        .update_assignment(&ids[1], "PM3", AssignmentState::Primary)
        .await
        .unwrap();
    store
        .update_assignment(&ids[2], "PM3", AssignmentState::Primary)
        .await
        .unwrap();
    store
        .update_status(&ids[0], TaskStatus::Completed)
        .await
        .unwrap();

    let metrics = store.metrics().await;
    assert_eq!(metrics.total_tasks, 3);
    assert!((metrics.completion_rate - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(metrics.role_workload["PX"], 1);
    assert_eq!(metrics.role_workload["PM3"], 2);
    assert_eq!(metrics.role_workload.len(), 2);
    // 3 tasks across 2 loaded roles.
    assert!((metrics.average_tasks_per_role - 1.5).abs() < 1e-9);
    assert_eq!(metrics.category_distribution["PX"], 1);
}

#[tokio::test]
async fn metrics_are_shared_until_a_mutation() {
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
    store.initialize().await;

    let a = store.metrics().await;
    let b = store.metrics().await;
    assert!(Arc::ptr_eq(&a, &b));

    store.add_task(draft("QAM", "Submittal review")).await;
    let c = store.metrics().await;
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(c.total_tasks, 4);
}

// ---- notifications ----

#[tokio::test]
async fn subscribers_see_the_full_mutation_stream() {
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
    let events: Arc<Mutex<Vec<StoreEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store.subscribe(move |event| sink.lock().push(event.clone()));

    store.initialize().await;
    let id = store.add_task(draft("PX", "Owner briefing")).await;
    store.update_status(&id, TaskStatus::Completed).await.unwrap();
    store.remove_task(&id).await;
    store.reset_to_default().await;

    let seen = events.lock();
    assert_eq!(
        *seen,
        vec![
            StoreEvent::Initialized,
            StoreEvent::TaskAdded {
                task_id: id.clone()
            },
            StoreEvent::TaskUpdated {
                task_id: id.clone()
            },
            StoreEvent::TaskRemoved { task_id: id },
            StoreEvent::Reset,
        ]
    );
}

#[tokio::test]
async fn failed_mutations_emit_no_events() {
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-1", "user-1", sample_seed());
    store.initialize().await;

    let count = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&count);
    store.subscribe(move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    let _ = store.update_status("ghost", TaskStatus::Completed).await;
    assert!(!store.remove_task("ghost").await);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

// ---- reset ----

#[tokio::test]
async fn reset_persists_a_fresh_seed_collection() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = MatrixStore::new(Arc::clone(&backend), "proj-1", "user-1", sample_seed());
    store.initialize().await;

    let id = store.add_task(draft("QAM", "Extra work")).await;
    store.update_status(&id, TaskStatus::Completed).await.unwrap();
    store.reset_to_default().await;

    assert_eq!(store.tasks().await.len(), 3);
    assert!(store.task(&id).await.is_none());
    assert_eq!(store.metrics().await.completion_rate, 0.0);

    // The reset state is what a reopened store restores.
    let reopened = MatrixStore::new(backend, "proj-1", "user-1", sample_seed());
    reopened.initialize().await;
    assert_eq!(reopened.snapshot().await, store.snapshot().await);
}

// ---- custom seeds ----

#[tokio::test]
async fn custom_seed_shapes_the_default_collection() {
    let seed = vec![
        SeedTask::new("prime-contract", "PM1", "Negotiate GMP amendment")
            .with_assignment("PM1", AssignmentState::Primary),
        SeedTask::new("prime-contract", "PX", "Sign owner change orders"),
    ];
    let store = MatrixStore::new(InMemoryBackend::new(), "proj-9", "user-1", seed);
    store.initialize().await;

    let tasks = store.tasks().await;
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].responsible, "PM1");
    assert_eq!(tasks[0].task_type, "prime-contract");
    assert_eq!(tasks[1].responsible, "");
}
