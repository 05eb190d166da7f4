//! Snapshot envelope and codec.
//!
//! A [`MatrixSnapshot`] is the exact unit persisted and restored for one
//! `(project_id, user_id)` scope: the task collection plus co-persisted
//! UI state. [`encode`] and [`decode`] convert it to and from versioned
//! JSON; [`default_snapshot`] builds the fallback from seed data.
//!
//! # Decode policy
//!
//! - Unknown envelope fields are ignored (forward compatibility).
//! - A task entry that fails to deserialize, or repeats an id already
//!   seen, is dropped with a warning; the rest of the snapshot loads.
//! - An envelope written by a newer crate version, or whose structure
//!   does not parse, is a [`MatrixError::Decode`] -- callers treat that
//!   the same as "no snapshot stored".

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SNAPSHOT_VERSION;
use crate::domain::{MatrixTask, SeedTask};
use crate::error::MatrixError;

/// View filter tabs of the matrix UI, co-persisted with the collection.
///
/// # Examples
///
/// ```
/// use respmatrix::MatrixTab;
///
/// assert_eq!(MatrixTab::default(), MatrixTab::Team);
/// assert_eq!(
///     serde_json::to_string(&MatrixTab::PrimeContract).unwrap(),
///     "\"prime-contract\""
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MatrixTab {
    /// Internal team responsibilities.
    #[default]
    Team,
    /// Prime-contract deliverables.
    PrimeContract,
    /// Subcontract scopes.
    Subcontract,
}

impl fmt::Display for MatrixTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Team => write!(f, "team"),
            Self::PrimeContract => write!(f, "prime-contract"),
            Self::Subcontract => write!(f, "subcontract"),
        }
    }
}

/// The persisted envelope: task collection plus UI state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixSnapshot {
    /// Envelope format version; see [`SNAPSHOT_VERSION`].
    pub version: u32,

    /// The task collection, insertion order significant.
    pub tasks: Vec<MatrixTask>,

    /// Currently selected view filter.
    pub active_tab: MatrixTab,

    /// When the collection last changed.
    pub last_updated: DateTime<Utc>,
}

/// Intermediate shape for lenient decoding: task entries stay raw so a
/// single bad record does not fail the whole envelope.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    version: u32,
    tasks: Vec<serde_json::Value>,
    active_tab: MatrixTab,
    last_updated: DateTime<Utc>,
}

/// Serializes a snapshot to its versioned JSON form.
pub fn encode(snapshot: &MatrixSnapshot) -> Result<Vec<u8>, MatrixError> {
    serde_json::to_vec(snapshot).map_err(|e| MatrixError::Decode {
        reason: format!("failed to serialize snapshot: {e}"),
    })
}

/// Parses and validates a raw snapshot payload.
///
/// See the module docs for the leniency rules. The returned snapshot
/// always carries `version == SNAPSHOT_VERSION`.
pub fn decode(raw: &[u8]) -> Result<MatrixSnapshot, MatrixError> {
    let parsed: RawSnapshot = serde_json::from_slice(raw).map_err(|e| MatrixError::Decode {
        reason: format!("malformed snapshot payload: {e}"),
    })?;

    if parsed.version > SNAPSHOT_VERSION {
        return Err(MatrixError::Decode {
            reason: format!(
                "snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                parsed.version
            ),
        });
    }

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut tasks = Vec::with_capacity(parsed.tasks.len());
    for entry in parsed.tasks {
        match serde_json::from_value::<MatrixTask>(entry) {
            Ok(task) => {
                if seen_ids.insert(task.id.clone()) {
                    tasks.push(task);
                } else {
                    tracing::warn!(task_id = %task.id, "dropping task with duplicate id from snapshot");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed task entry from snapshot");
            }
        }
    }

    Ok(MatrixSnapshot {
        version: SNAPSHOT_VERSION,
        tasks,
        active_tab: parsed.active_tab,
        last_updated: parsed.last_updated,
    })
}

/// Builds the fallback snapshot from seed data.
///
/// Each seed entry becomes a full record scoped to `project_id`; the
/// active tab is the default ([`MatrixTab::Team`]) and `last_updated`
/// is now.
pub fn default_snapshot(project_id: &str, seed: &[SeedTask]) -> MatrixSnapshot {
    MatrixSnapshot {
        version: SNAPSHOT_VERSION,
        tasks: seed.iter().map(|s| s.expand(project_id)).collect(),
        active_tab: MatrixTab::default(),
        last_updated: Utc::now(),
    }
}
