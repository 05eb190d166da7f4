//! Matrix task record -- the store's representation of one activity row.
//!
//! [`MatrixTask`] is both the in-memory record and the wire shape: it is
//! serialized verbatim into the snapshot envelope. All invariant-bearing
//! mutations (assignment changes that affect the responsible role) go
//! through methods here so the single-primary rule cannot be bypassed.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_ROLE_KEYS, UNASSIGNED};

/// Assignment state of one role on one task.
///
/// At most one role per task may hold `Primary`; this is enforced by
/// [`MatrixTask::set_assignment`], never by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AssignmentState {
    /// The role leading this task. The task's `responsible` field always
    /// points at the (single) role in this state.
    Primary,
    /// The role assists on this task.
    Support,
    /// The role is not involved.
    #[default]
    None,
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "Primary"),
            Self::Support => write!(f, "Support"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Lifecycle status of a task.
///
/// # Examples
///
/// ```
/// use respmatrix::TaskStatus;
///
/// assert_eq!(serde_json::to_string(&TaskStatus::Active).unwrap(), "\"active\"");
/// assert!(TaskStatus::Completed.is_completed());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is being worked.
    #[default]
    Active,
    /// Task is waiting on something before work can start.
    Pending,
    /// Task is done (counted by the completion-rate metric).
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl TaskStatus {
    /// Returns `true` for `Completed`.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// One row of the responsibility matrix.
///
/// `id` and `project_id` are set at creation and never change. The
/// `responsible` field is denormalized from `assignments`: it names the
/// role currently holding [`AssignmentState::Primary`], or the empty
/// [`UNASSIGNED`] sentinel when no role does. It is kept in sync by
/// [`set_assignment`](MatrixTask::set_assignment) and must never be
/// written independently.
///
/// # Examples
///
/// ```
/// use respmatrix::domain::{AssignmentState, MatrixTask};
///
/// let mut task = MatrixTask::new("proj-1", "team", "PX", "Review pay applications");
/// assert_eq!(task.responsible, "");
///
/// task.set_assignment("PM3", AssignmentState::Primary);
/// assert_eq!(task.responsible, "PM3");
/// assert_eq!(task.assignments["PM3"], AssignmentState::Primary);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixTask {
    /// Opaque unique id, generated at creation.
    pub id: String,

    /// Owning project scope. Immutable.
    pub project_id: String,

    /// Matrix section this task belongs to (e.g. `"team"`,
    /// `"prime-contract"`). Serialized as `type` on the wire.
    #[serde(rename = "type")]
    pub task_type: String,

    /// Classification tag, usually a role abbreviation.
    pub category: String,

    /// Display name of the activity.
    pub task: String,

    /// Role key currently responsible, or [`UNASSIGNED`].
    pub responsible: String,

    /// Role key -> assignment state. A `BTreeMap` keeps encoding order
    /// deterministic so snapshots round-trip byte-stable.
    pub assignments: BTreeMap<String, AssignmentState>,

    /// Lifecycle status.
    pub status: TaskStatus,

    /// Free-text notes, append-only.
    #[serde(default)]
    pub annotations: Vec<String>,

    /// Set once at creation.
    pub created_at: DateTime<Utc>,

    /// Bumped on every mutation of this record.
    pub updated_at: DateTime<Utc>,
}

impl MatrixTask {
    /// Creates a new task with a generated UUIDv4 id, `Active` status,
    /// every default role unassigned, and both timestamps set to now.
    pub fn new(project_id: &str, task_type: &str, category: &str, task: &str) -> Self {
        let now = Utc::now();
        let assignments = DEFAULT_ROLE_KEYS
            .iter()
            .map(|role| ((*role).to_string(), AssignmentState::None))
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            task_type: task_type.to_string(),
            category: category.to_string(),
            task: task.to_string(),
            responsible: UNASSIGNED.to_string(),
            assignments,
            status: TaskStatus::Active,
            annotations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets one role's assignment state, enforcing the single-primary
    /// invariant.
    ///
    /// When `state` is `Primary`, any *other* role currently holding
    /// `Primary` is demoted to `Support` (the previous lead stays on the
    /// task) and `responsible` is repointed at `role`. When `state` is
    /// not `Primary` and `role` was the responsible one, `responsible`
    /// reverts to [`UNASSIGNED`].
    ///
    /// Always bumps `updated_at`.
    pub fn set_assignment(&mut self, role: &str, state: AssignmentState) {
        if state == AssignmentState::Primary {
            for (other, existing) in &mut self.assignments {
                if other != role && *existing == AssignmentState::Primary {
                    *existing = AssignmentState::Support;
                }
            }
            self.responsible = role.to_string();
        } else if self.responsible == role {
            self.responsible = UNASSIGNED.to_string();
        }

        self.assignments.insert(role.to_string(), state);
        self.touch();
    }

    /// Sets the lifecycle status and bumps `updated_at`.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.touch();
    }

    /// Replaces the classification tag and bumps `updated_at`.
    pub fn set_category(&mut self, category: &str) {
        self.category = category.to_string();
        self.touch();
    }

    /// Appends a free-text note. Annotations are never edited in place.
    pub fn add_annotation(&mut self, note: &str) {
        self.annotations.push(note.to_string());
        self.touch();
    }

    /// Returns the role currently holding `Primary`, if any, derived
    /// from the assignments map rather than the denormalized field.
    pub fn primary_role(&self) -> Option<&str> {
        self.assignments
            .iter()
            .find(|(_, state)| **state == AssignmentState::Primary)
            .map(|(role, _)| role.as_str())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Caller-supplied fields for a new task; everything else is generated.
///
/// Assignments listed in `assignments` are applied through
/// [`MatrixTask::set_assignment`] in order, so a draft naming two primary
/// roles still yields a record with exactly one.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    /// Matrix section, e.g. `"team"`.
    pub task_type: String,
    /// Classification tag.
    pub category: String,
    /// Display name.
    pub task: String,
    /// Initial status; `None` means `Active`.
    pub status: Option<TaskStatus>,
    /// Initial role assignments applied on top of the all-`None` default.
    pub assignments: Vec<(String, AssignmentState)>,
}

impl TaskDraft {
    /// Expands this draft into a full record scoped to `project_id`.
    pub fn into_task(self, project_id: &str) -> MatrixTask {
        let mut record = MatrixTask::new(project_id, &self.task_type, &self.category, &self.task);
        if let Some(status) = self.status {
            record.status = status;
        }
        for (role, state) in &self.assignments {
            record.set_assignment(role, *state);
        }
        record
    }
}
