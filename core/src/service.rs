//! Build service (C7).
//!
//! Orchestrates the full build/task lifecycle: creation, queue edits
//! (append, insert, delete, patch, reorder), and build-level execution.
//! Depends only on the [`BuildRepository`] and [`WorldEffectPort`] traits,
//! plus an injectable [`Clock`], so tests can wire in-memory doubles for
//! all three — per the spec's design notes on explicit configuration.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::coordinate::bbox_of;
use crate::domain::{Build, BuildStatus, Task, TaskStatus, TaskType};
use crate::error::ServiceError;
use crate::executor::TaskExecutor;
use crate::repository::BuildRepository;
use crate::validate;
use crate::world::WorldEffectPort;

/// Summary returned by [`BuildService::execute_build`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildExecutionSummary {
    pub build_id: Uuid,
    pub success: bool,
    pub tasks_executed: usize,
    pub tasks_failed: usize,
    pub message: String,
}

pub struct BuildService {
    repo: Arc<dyn BuildRepository>,
    executor: TaskExecutor,
    clock: Arc<dyn Clock>,
}

impl BuildService {
    pub fn new(repo: Arc<dyn BuildRepository>, port: Arc<dyn WorldEffectPort>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            executor: TaskExecutor::new(port),
            clock,
        }
    }

    pub fn with_executor(repo: Arc<dyn BuildRepository>, executor: TaskExecutor, clock: Arc<dyn Clock>) -> Self {
        Self { repo, executor, clock }
    }

    pub async fn create_build(
        &self,
        name: String,
        description: Option<String>,
        world: Option<String>,
    ) -> Result<Build, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("name must not be empty".to_string()));
        }
        let build = Build::new(name, description, world, self.clock.now());
        let build = self.repo.create_build(build).await?;
        info!(build_id = %build.id, "created build");
        Ok(build)
    }

    pub async fn get_build(&self, id: Uuid) -> Result<Build, ServiceError> {
        self.repo
            .get_build(id)
            .await?
            .ok_or(ServiceError::BuildNotFound(id))
    }

    pub async fn list_tasks(&self, build_id: Uuid) -> Result<Vec<Task>, ServiceError> {
        self.get_build(build_id).await?;
        Ok(self.repo.get_tasks_ordered(build_id).await?)
    }

    async fn require_editable_build(&self, build_id: Uuid) -> Result<Build, ServiceError> {
        let build = self.get_build(build_id).await?;
        if build.status == BuildStatus::Completed {
            return Err(ServiceError::BuildCompleted(build_id));
        }
        Ok(build)
    }

    /// Appends a task to the end of the queue (C7 "Add task").
    pub async fn add_task(
        &self,
        build_id: Uuid,
        task_type: TaskType,
        task_data: JsonValue,
        description: Option<String>,
    ) -> Result<Task, ServiceError> {
        self.require_editable_build(build_id).await?;
        validate::validate(task_type, &task_data)?;

        let bounds = bbox_of(task_type, &task_data);
        let task = Task::new(build_id, 0, task_type, task_data, description, bounds);
        let task = self.repo.add_task_to_end(task).await?;
        info!(build_id = %build_id, task_id = %task.id, task_order = task.task_order, "appended task");
        Ok(task)
    }

    /// Inserts a task at position `p`, clamped to `[0, len]`, and bumps the
    /// order of every existing task at or after `p`.
    pub async fn insert_task_at(
        &self,
        build_id: Uuid,
        position: usize,
        task_type: TaskType,
        task_data: JsonValue,
        description: Option<String>,
    ) -> Result<Task, ServiceError> {
        self.require_editable_build(build_id).await?;
        validate::validate(task_type, &task_data)?;

        let mut existing = self.repo.get_tasks_ordered(build_id).await?;
        let clamped = position.min(existing.len());
        let bounds = bbox_of(task_type, &task_data);
        let new_task = Task::new(build_id, clamped as i64, task_type, task_data, description, bounds);

        existing.insert(clamped, new_task.clone());
        for (i, task) in existing.iter_mut().enumerate() {
            task.task_order = i as i64;
        }
        self.repo.replace_task_queue(build_id, existing).await?;

        info!(build_id = %build_id, task_id = %new_task.id, position = clamped, "inserted task");
        Ok(new_task)
    }

    /// Removes a task, then compacts the remaining orders back to `[0, n-1]`.
    pub async fn delete_task(&self, build_id: Uuid, task_id: Uuid) -> Result<(), ServiceError> {
        self.require_editable_build(build_id).await?;
        let task = self.get_task_in_build(build_id, task_id).await?;

        let mut remaining: Vec<Task> = self
            .repo
            .get_tasks_ordered(build_id)
            .await?
            .into_iter()
            .filter(|t| t.id != task.id)
            .collect();
        for (i, t) in remaining.iter_mut().enumerate() {
            t.task_order = i as i64;
        }
        self.repo.replace_task_queue(build_id, remaining).await?;
        info!(build_id = %build_id, task_id = %task_id, "deleted task");
        Ok(())
    }

    /// Shallow-merges `patch` onto the task's existing `task_data`, updates
    /// `description` if given, and recomputes `bounds`. Does not touch
    /// `status`.
    pub async fn patch_task(
        &self,
        build_id: Uuid,
        task_id: Uuid,
        patch: Option<JsonValue>,
        description: Option<String>,
    ) -> Result<Task, ServiceError> {
        self.require_editable_build(build_id).await?;
        if patch.is_none() && description.is_none() {
            return Err(ServiceError::InvalidInput(
                "patch must supply task_data or description".to_string(),
            ));
        }
        let mut task = self.get_task_in_build(build_id, task_id).await?;

        if let Some(patch) = patch {
            merge_shallow(&mut task.task_data, &patch);
        }
        validate::validate(task.task_type, &task.task_data)?;

        let bounds = bbox_of(task.task_type, &task.task_data);
        let new_description = description.or_else(|| task.description.clone());

        self.repo
            .update_task_data(task_id, task.task_data.clone(), new_description.clone(), bounds)
            .await?;

        task.description = new_description;
        task.bounds = bounds;
        Ok(task)
    }

    /// Reassigns `task_order = index` for the given ID list. Any ID not
    /// belonging to the build is a client error.
    pub async fn reorder_queue(&self, build_id: Uuid, ordered_ids: Vec<Uuid>) -> Result<(), ServiceError> {
        self.require_editable_build(build_id).await?;
        let existing = self.repo.get_tasks_ordered(build_id).await?;

        if ordered_ids.len() != existing.len() {
            return Err(ServiceError::InvalidInput(format!(
                "reorder list has {} ids but build has {} tasks",
                ordered_ids.len(),
                existing.len()
            )));
        }

        let mut by_id: std::collections::HashMap<Uuid, Task> =
            existing.into_iter().map(|t| (t.id, t)).collect();

        let mut reordered = Vec::with_capacity(ordered_ids.len());
        for (index, id) in ordered_ids.into_iter().enumerate() {
            let mut task = by_id
                .remove(&id)
                .ok_or_else(|| ServiceError::TaskNotInBuild { build_id, task_id: id })?;
            task.task_order = index as i64;
            reordered.push(task);
        }

        self.repo.replace_task_queue(build_id, reordered).await?;
        info!(build_id = %build_id, "reordered queue");
        Ok(())
    }

    pub async fn delete_build(&self, build_id: Uuid) -> Result<(), ServiceError> {
        self.get_build(build_id).await?;
        self.repo.delete_build(build_id).await?;
        info!(build_id = %build_id, "deleted build (cascade)");
        Ok(())
    }

    async fn get_task_in_build(&self, build_id: Uuid, task_id: Uuid) -> Result<Task, ServiceError> {
        let task = self
            .repo
            .get_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;
        if task.build_id != build_id {
            return Err(ServiceError::TaskNotInBuild { build_id, task_id });
        }
        Ok(task)
    }

    /// Executes every non-completed task in order, never stopping on a
    /// single task's failure. Final build status is `COMPLETED` iff zero
    /// tasks failed in this run.
    pub async fn execute_build(&self, build_id: Uuid) -> Result<BuildExecutionSummary, ServiceError> {
        let build = self.get_build(build_id).await?;
        if build.status == BuildStatus::Completed {
            return Err(ServiceError::BuildCompleted(build_id));
        }

        // Conditional update guards against two concurrent execute_build
        // calls both racing the same task list (spec §9 open question).
        let claimed = self
            .repo
            .update_build_status(
                build_id,
                &[BuildStatus::Created, BuildStatus::Failed],
                BuildStatus::InProgress,
                None,
            )
            .await?;
        if !claimed {
            return Err(ServiceError::InvalidInput(format!(
                "build {build_id} is already executing"
            )));
        }

        let tasks = self.repo.get_tasks_ordered(build_id).await?;
        let mut executed = 0usize;
        let mut failed = 0usize;

        for task in tasks {
            if task.status == TaskStatus::Completed {
                executed += 1;
                continue;
            }

            let result = self.executor.execute_task(&task).await;
            executed += 1;

            if result.success {
                self.repo
                    .update_task_status(task.id, TaskStatus::Completed, Some(self.clock.now()), None)
                    .await?;
            } else {
                failed += 1;
                warn!(build_id = %build_id, task_id = %task.id, error = ?result.error_message, "task failed");
                self.repo
                    .update_task_status(
                        task.id,
                        TaskStatus::Failed,
                        Some(self.clock.now()),
                        result.error_message,
                    )
                    .await?;
            }
        }

        let final_status = if failed == 0 { BuildStatus::Completed } else { BuildStatus::Failed };
        self.repo
            .update_build_status(build_id, &[], final_status, Some(self.clock.now()))
            .await?;

        let message = if failed == 0 {
            format!("executed {executed} task(s) successfully")
        } else {
            format!("executed {executed} task(s), {failed} failed")
        };

        info!(build_id = %build_id, executed, failed, "build execution finished");

        Ok(BuildExecutionSummary {
            build_id,
            success: failed == 0,
            tasks_executed: executed,
            tasks_failed: failed,
            message,
        })
    }
}

/// Shallow, field-wise merge of `patch` onto `base`. Non-object patches
/// replace the base wholesale, matching how a partial-update document would
/// behave if the base itself were not an object.
fn merge_shallow(base: &mut JsonValue, patch: &JsonValue) {
    match (base, patch) {
        (JsonValue::Object(base_map), JsonValue::Object(patch_map)) => {
            for (k, v) in patch_map {
                base_map.insert(k.clone(), v.clone());
            }
        }
        (base, patch) => {
            *base = patch.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::MemoryStore;
    use crate::world::{FailingWorldEffectPort, NoopWorldEffectPort};
    use chrono::Utc;
    use serde_json::json;

    fn service() -> BuildService {
        BuildService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(NoopWorldEffectPort),
            Arc::new(FixedClock::new(Utc::now(), 1000)),
        )
    }

    fn fill_payload() -> JsonValue {
        json!({
            "x1": 0, "y1": 0, "z1": 0, "x2": 1, "y2": 1, "z2": 1,
            "block_type": "minecraft:stone",
        })
    }

    #[tokio::test]
    async fn append_then_read_preserves_order() {
        let svc = service();
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();

        for _ in 0..3 {
            svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None)
                .await
                .unwrap();
        }

        let tasks = svc.list_tasks(build.id).await.unwrap();
        let orders: Vec<i64> = tasks.iter().map(|t| t.task_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn insert_middle_shifts_subsequent_orders() {
        let svc = service();
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();
        let t1 = svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();
        let t2 = svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();
        let t3 = svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();

        let tx = svc
            .insert_task_at(build.id, 1, TaskType::BlockFill, fill_payload(), None)
            .await
            .unwrap();

        let tasks = svc.list_tasks(build.id).await.unwrap();
        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![t1.id, tx.id, t2.id, t3.id]);
        let orders: Vec<i64> = tasks.iter().map(|t| t.task_order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn delete_compacts_orders() {
        let svc = service();
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();
        let t1 = svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();
        let t2 = svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();
        let t3 = svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();

        svc.delete_task(build.id, t2.id).await.unwrap();

        let tasks = svc.list_tasks(build.id).await.unwrap();
        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![t1.id, t3.id]);
        let orders: Vec<i64> = tasks.iter().map(|t| t.task_order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[tokio::test]
    async fn partial_execute_isolates_failures_and_continues() {
        let svc = BuildService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(NoopWorldEffectPort),
            Arc::new(FixedClock::new(Utc::now(), 1000)),
        );
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();
        svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();
        // Missing block_type -> fails validation inside the executor.
        svc.add_task(
            build.id,
            TaskType::BlockFill,
            json!({"x1": 0, "y1": 0, "z1": 0, "x2": 1, "y2": 1, "z2": 1}),
            None,
        )
        .await
        .unwrap();
        svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();

        let summary = svc.execute_build(build.id).await.unwrap();
        assert_eq!(summary.tasks_executed, 3);
        assert_eq!(summary.tasks_failed, 1);
        assert!(!summary.success);

        let build = svc.get_build(build.id).await.unwrap();
        assert_eq!(build.status, BuildStatus::Failed);
    }

    #[tokio::test]
    async fn all_tasks_succeeding_completes_the_build() {
        let svc = service();
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();
        svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();
        svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();

        let summary = svc.execute_build(build.id).await.unwrap();
        assert!(summary.success);

        let build = svc.get_build(build.id).await.unwrap();
        assert_eq!(build.status, BuildStatus::Completed);
        assert!(build.completed_at.is_some());
    }

    #[tokio::test]
    async fn completed_build_rejects_further_mutation() {
        let svc = service();
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();
        svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();
        svc.execute_build(build.id).await.unwrap();

        let err = svc
            .add_task(build.id, TaskType::BlockFill, fill_payload(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BuildCompleted(_)));
    }

    #[tokio::test]
    async fn failed_build_may_be_re_executed() {
        let svc = BuildService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FailingWorldEffectPort {
                message: "boom".to_string(),
            }),
            Arc::new(FixedClock::new(Utc::now(), 1000)),
        );
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();
        svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();

        let summary = svc.execute_build(build.id).await.unwrap();
        assert!(!summary.success);

        // Re-execution is permitted unless the build is COMPLETED.
        let summary2 = svc.execute_build(build.id).await.unwrap();
        assert!(!summary2.success);
    }

    #[tokio::test]
    async fn patch_recomputes_bounds() {
        let svc = service();
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();
        let task = svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();

        let updated = svc
            .patch_task(build.id, task.id, Some(json!({"x2": 5})), None)
            .await
            .unwrap();
        assert_eq!(updated.bounds.unwrap().max_x, 5);
    }

    #[tokio::test]
    async fn reorder_rejects_foreign_task_id() {
        let svc = service();
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();
        svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();

        let err = svc.reorder_queue(build.id, vec![Uuid::new_v4()]).await.unwrap_err();
        assert!(matches!(err, ServiceError::TaskNotInBuild { .. }));
    }

    #[tokio::test]
    async fn reorder_is_idempotent_on_current_order() {
        let svc = service();
        let build = svc.create_build("Tower".to_string(), None, None).await.unwrap();
        svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();
        svc.add_task(build.id, TaskType::BlockFill, fill_payload(), None).await.unwrap();

        let before = svc.list_tasks(build.id).await.unwrap();
        let ids: Vec<Uuid> = before.iter().map(|t| t.id).collect();

        svc.reorder_queue(build.id, ids.clone()).await.unwrap();

        let after = svc.list_tasks(build.id).await.unwrap();
        let ids_after: Vec<Uuid> = after.iter().map(|t| t.id).collect();
        assert_eq!(ids, ids_after);
    }
}
