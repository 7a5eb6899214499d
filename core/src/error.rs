//! Error taxonomy for the build-task orchestration core.
//!
//! Mirrors the boundary split the teacher uses between repository-level
//! errors (`DslError`) and service-level errors: storage failures are
//! wrapped rather than swallowed, and state/validation errors are kept
//! distinct so a transport layer can map them to different status codes.

use uuid::Uuid;

/// Errors surfaced by a [`crate::repository::BuildRepository`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Field-level validation failure from the task-data validator (C4).
#[derive(Debug, Clone, Default, thiserror::Error)]
#[error("{}", .0.join("; "))]
pub struct ValidationError(pub Vec<String>);

impl ValidationError {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn merge(mut self, other: ValidationError) -> Self {
        self.0.extend(other.0);
        self
    }
}

/// Errors surfaced by the build service (C7) and location/audit service (C8).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("build not found: {0}")]
    BuildNotFound(Uuid),

    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("task {task_id} does not belong to build {build_id}")]
    TaskNotInBuild { build_id: Uuid, task_id: Uuid },

    #[error("build {0} is completed and can no longer be edited")]
    BuildCompleted(Uuid),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}
