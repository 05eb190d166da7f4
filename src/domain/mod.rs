//! Domain types: the matrix task record, its enums, and seed data.

pub mod record;
pub mod seed;

pub use record::{AssignmentState, MatrixTask, TaskDraft, TaskStatus};
pub use seed::{sample_seed, SeedTask};
