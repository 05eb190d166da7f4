//! Derived aggregate metrics over a task collection.
//!
//! [`MatrixMetrics::compute`] is a pure function of the collection; the
//! store memoizes the result against its mutation revision so repeated
//! reads between mutations return the identical value.

use std::collections::BTreeMap;

use crate::constants::UNASSIGNED;
use crate::domain::MatrixTask;

/// Aggregate statistics derived from the current task collection.
///
/// # Examples
///
/// ```
/// use respmatrix::MatrixMetrics;
///
/// let metrics = MatrixMetrics::compute(&[]);
/// assert_eq!(metrics.total_tasks, 0);
/// assert_eq!(metrics.completion_rate, 0.0);
/// assert_eq!(metrics.average_tasks_per_role, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatrixMetrics {
    /// Number of tasks in the collection.
    pub total_tasks: usize,

    /// Percentage of tasks with `Completed` status, in `[0, 100]`.
    /// `0.0` for an empty collection (never NaN).
    pub completion_rate: f64,

    /// Responsible role key -> number of tasks it leads. Tasks with no
    /// responsible role are not counted under any key.
    pub role_workload: BTreeMap<String, usize>,

    /// Category -> number of tasks carrying it.
    pub category_distribution: BTreeMap<String, usize>,

    /// `total_tasks` divided by the number of roles with nonzero
    /// workload; `0.0` when no role leads anything.
    pub average_tasks_per_role: f64,
}

impl MatrixMetrics {
    /// Computes all aggregates in one pass over the collection.
    pub fn compute(tasks: &[MatrixTask]) -> Self {
        let total_tasks = tasks.len();

        let completed = tasks.iter().filter(|t| t.status.is_completed()).count();
        let completion_rate = if total_tasks == 0 {
            0.0
        } else {
            100.0 * completed as f64 / total_tasks as f64
        };

        let mut role_workload: BTreeMap<String, usize> = BTreeMap::new();
        let mut category_distribution: BTreeMap<String, usize> = BTreeMap::new();
        for task in tasks {
            if task.responsible != UNASSIGNED {
                *role_workload.entry(task.responsible.clone()).or_default() += 1;
            }
            *category_distribution
                .entry(task.category.clone())
                .or_default() += 1;
        }

        let loaded_roles = role_workload.len();
        let average_tasks_per_role = if loaded_roles == 0 {
            0.0
        } else {
            total_tasks as f64 / loaded_roles as f64
        };

        Self {
            total_tasks,
            completion_rate,
            role_workload,
            category_distribution,
            average_tasks_per_role,
        }
    }
}
