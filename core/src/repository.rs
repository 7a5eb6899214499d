//! Persistence adapter contract (C3).
//!
//! Mirrors the teacher's repository-trait-plus-struct pairing
//! (`DslDomainRepositoryTrait` / `DslDomainRepository`): the trait is the
//! contract any backing store must satisfy, concrete structs (an in-memory
//! one for tests, a Postgres one behind the `postgres` feature) implement it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::coordinate::BoundingBox;
use crate::domain::{Build, BuildStatus, Task, TaskStatus};
use crate::error::StoreError;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait BuildRepository: Send + Sync {
    async fn create_build(&self, build: Build) -> Result<Build, StoreError>;

    async fn get_build(&self, id: Uuid) -> Result<Option<Build>, StoreError>;

    /// Conditional status update: only applies if the build's current status
    /// is one of `from`. Returns `Ok(false)` (not an error) if no row
    /// matched, so callers can implement the recommended
    /// `CREATED/FAILED -> IN_PROGRESS` race guard from the spec's design
    /// notes.
    async fn update_build_status(
        &self,
        id: Uuid,
        from: &[BuildStatus],
        to: BuildStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;

    async fn list_builds_intersecting(
        &self,
        world: &str,
        query: BoundingBox,
    ) -> Result<Vec<Build>, StoreError>;

    /// Assigns the next dense `task_order` atomically and inserts.
    async fn add_task_to_end(&self, task: Task) -> Result<Task, StoreError>;

    async fn get_tasks_ordered(&self, build_id: Uuid) -> Result<Vec<Task>, StoreError>;

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Replaces the full task queue for a build within a single transaction,
    /// preserving task identity by `id`. The passed tasks' `task_order`
    /// fields are taken as authoritative and must already be dense.
    async fn replace_task_queue(&self, build_id: Uuid, tasks: Vec<Task>) -> Result<(), StoreError>;

    async fn update_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        executed_at: Option<DateTime<Utc>>,
        error_message: Option<String>,
    ) -> Result<(), StoreError>;

    async fn update_task_data(
        &self,
        task_id: Uuid,
        task_data: serde_json::Value,
        description: Option<String>,
        bounds: Option<BoundingBox>,
    ) -> Result<(), StoreError>;

    /// Deletes a single task. The caller (build service) is responsible for
    /// renumbering the remaining tasks via `replace_task_queue`.
    async fn delete_task(&self, task_id: Uuid) -> Result<(), StoreError>;

    async fn delete_build(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_tasks_intersecting(
        &self,
        world: &str,
        query: BoundingBox,
    ) -> Result<Vec<Task>, StoreError>;
}
