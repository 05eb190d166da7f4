//! Seed data -- the default collection a fresh scope starts from.
//!
//! Seeds are partial records: the snapshot codec's
//! [`default_snapshot`](crate::snapshot::default_snapshot) expands each
//! one into a full [`MatrixTask`](crate::domain::MatrixTask) with a
//! generated id and timestamps. The seed source is the caller's concern
//! (embedded constant, config file, remote fetch); [`sample_seed`]
//! provides a small built-in set so stores work out of the box.

use crate::domain::record::{AssignmentState, MatrixTask, TaskDraft, TaskStatus};

/// One entry of a seed collection.
///
/// # Examples
///
/// ```
/// use respmatrix::domain::SeedTask;
///
/// let seed = SeedTask::new("team", "PX", "Executive oversight");
/// let task = seed.expand("proj-1");
/// assert_eq!(task.category, "PX");
/// assert_eq!(task.project_id, "proj-1");
/// ```
#[derive(Debug, Clone)]
pub struct SeedTask {
    /// Matrix section, e.g. `"team"`.
    pub task_type: String,
    /// Classification tag.
    pub category: String,
    /// Display name of the activity.
    pub task: String,
    /// Initial assignments, applied in order through the single-primary
    /// enforcement path.
    pub assignments: Vec<(String, AssignmentState)>,
}

impl SeedTask {
    /// Creates a seed entry with no initial assignments.
    pub fn new(task_type: &str, category: &str, task: &str) -> Self {
        Self {
            task_type: task_type.to_string(),
            category: category.to_string(),
            task: task.to_string(),
            assignments: Vec::new(),
        }
    }

    /// Adds an initial assignment.
    pub fn with_assignment(mut self, role: &str, state: AssignmentState) -> Self {
        self.assignments.push((role.to_string(), state));
        self
    }

    /// Expands this seed into a full record scoped to `project_id`.
    pub fn expand(&self, project_id: &str) -> MatrixTask {
        TaskDraft {
            task_type: self.task_type.clone(),
            category: self.category.clone(),
            task: self.task.clone(),
            status: Some(TaskStatus::Active),
            assignments: self.assignments.clone(),
        }
        .into_task(project_id)
    }
}

/// The built-in sample seed: three team activities, one per leading role.
pub fn sample_seed() -> Vec<SeedTask> {
    vec![
        SeedTask::new("team", "PX", "Monthly owner progress meeting"),
        SeedTask::new("team", "PM3", "Maintain master construction schedule"),
        SeedTask::new("team", "APM", "Collect daily field reports"),
    ]
}
