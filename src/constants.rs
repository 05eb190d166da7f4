//! Constants for scope keys, snapshot versioning, and role keys.

/// Prefix for durable-storage scope keys.
///
/// A full scope key has the form
/// `responsibility-matrix:{project_id}:{user_id}` -- see
/// [`scope_key`](crate::store::backend::scope_key).
pub const SCOPE_KEY_PREFIX: &str = "responsibility-matrix";

/// Version number written into every persisted snapshot envelope.
///
/// Snapshots with a *newer* version than this are rejected at decode
/// time and treated as absent (the store falls back to seed data).
pub const SNAPSHOT_VERSION: u32 = 1;

/// Sentinel value for [`MatrixTask::responsible`](crate::domain::MatrixTask::responsible)
/// when no role holds the primary assignment.
pub const UNASSIGNED: &str = "";

/// The fixed set of role keys a task's assignments range over.
///
/// Mirrors the project staffing roles of the source product: project
/// executive, senior/junior project managers, assistant PM, and quality
/// assurance manager.
pub const DEFAULT_ROLE_KEYS: &[&str] = &["PX", "PM1", "PM2", "PM3", "APM", "QAM"];
