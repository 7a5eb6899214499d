//! In-memory [`BuildRepository`] implementation for tests and local
//! development, matching the spec's design-notes requirement that tests
//! supply an in-memory store rather than a real database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::coordinate::BoundingBox;
use crate::domain::{Build, BuildStatus, Task, TaskStatus};
use crate::error::StoreError;
use crate::repository::BuildRepository;

#[derive(Default)]
struct Inner {
    builds: HashMap<Uuid, Build>,
    tasks: HashMap<Uuid, Task>,
}

/// A `Mutex`-guarded in-memory store. Single-process only; good enough for
/// unit/integration tests, which is its only intended use.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BuildRepository for MemoryStore {
    async fn create_build(&self, build: Build) -> Result<Build, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.builds.contains_key(&build.id) {
            return Err(StoreError::Conflict(format!("build {} already exists", build.id)));
        }
        inner.builds.insert(build.id, build.clone());
        Ok(build)
    }

    async fn get_build(&self, id: Uuid) -> Result<Option<Build>, StoreError> {
        Ok(self.inner.lock().unwrap().builds.get(&id).cloned())
    }

    async fn update_build_status(
        &self,
        id: Uuid,
        from: &[BuildStatus],
        to: BuildStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(build) = inner.builds.get_mut(&id) else {
            return Err(StoreError::NotFound);
        };
        if !from.is_empty() && !from.contains(&build.status) {
            return Ok(false);
        }
        build.status = to;
        if let Some(completed_at) = completed_at {
            build.completed_at = Some(completed_at);
        }
        Ok(true)
    }

    async fn list_builds_intersecting(
        &self,
        world: &str,
        query: BoundingBox,
    ) -> Result<Vec<Build>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut matches: Vec<Build> = inner
            .builds
            .values()
            .filter(|b| b.world == world)
            .filter(|b| {
                inner
                    .tasks
                    .values()
                    .any(|t| t.build_id == b.id && t.bounds.is_some_and(|bb| bb.intersects(&query)))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn add_task_to_end(&self, mut task: Task) -> Result<Task, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let next_order = inner
            .tasks
            .values()
            .filter(|t| t.build_id == task.build_id)
            .map(|t| t.task_order + 1)
            .max()
            .unwrap_or(0);
        task.task_order = next_order;
        inner.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_tasks_ordered(&self, build_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.build_id == build_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.task_order);
        Ok(tasks)
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.inner.lock().unwrap().tasks.get(&task_id).cloned())
    }

    async fn replace_task_queue(&self, build_id: Uuid, tasks: Vec<Task>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.tasks.retain(|_, t| t.build_id != build_id);
        for task in tasks {
            inner.tasks.insert(task.id, task);
        }
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        executed_at: Option<DateTime<Utc>>,
        error_message: Option<String>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let task = inner.tasks.get_mut(&task_id).ok_or(StoreError::NotFound)?;
        task.status = status;
        task.executed_at = executed_at;
        task.error_message = error_message;
        Ok(())
    }

    async fn update_task_data(
        &self,
        task_id: Uuid,
        task_data: serde_json::Value,
        description: Option<String>,
        bounds: Option<BoundingBox>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let task = inner.tasks.get_mut(&task_id).ok_or(StoreError::NotFound)?;
        task.task_data = task_data;
        if description.is_some() {
            task.description = description;
        }
        task.bounds = bounds;
        Ok(())
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.tasks.remove(&task_id).ok_or(StoreError::NotFound)?;
        Ok(())
    }

    async fn delete_build(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.builds.remove(&id).ok_or(StoreError::NotFound)?;
        inner.tasks.retain(|_, t| t.build_id != id);
        Ok(())
    }

    async fn list_tasks_intersecting(
        &self,
        world: &str,
        query: BoundingBox,
    ) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let tasks = inner
            .tasks
            .values()
            .filter(|t| {
                inner
                    .builds
                    .get(&t.build_id)
                    .is_some_and(|b| b.world == world)
            })
            .filter(|t| t.bounds.is_some_and(|bb| bb.intersects(&query)))
            .cloned()
            .collect();
        Ok(tasks)
    }
}
