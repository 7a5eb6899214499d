//! `BuildRepository` implementation over `sqlx::PgPool`.
//!
//! Table layout follows the teacher's convention of TEXT-plus-CHECK columns
//! for status/kind enums (see `database/dsl_domain_repository.rs`'s
//! `compilation_status` column) rather than native Postgres enum types, so
//! new variants are additive migrations instead of `ALTER TYPE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::coordinate::BoundingBox;
use crate::domain::{Build, BuildStatus, Task, TaskStatus, TaskType};
use crate::error::StoreError;
use crate::repository::BuildRepository;

use super::StoreConfig;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Builds a connection pool per `config` and ensures the `buildtask`
    /// schema and its tables exist, mirroring the teacher's
    /// `DatabaseManager::new` (pool construction + an idempotent schema
    /// bootstrap) rather than a separate migrations runner.
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let store = Self { pool };
        store.bootstrap_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn bootstrap_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA_DDL)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

const SCHEMA_DDL: &str = r#"
CREATE SCHEMA IF NOT EXISTS buildtask;

CREATE TABLE IF NOT EXISTS buildtask.builds (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    world TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('CREATED', 'IN_PROGRESS', 'COMPLETED', 'FAILED')),
    created_at TIMESTAMPTZ NOT NULL,
    completed_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS buildtask.tasks (
    id UUID PRIMARY KEY,
    build_id UUID NOT NULL REFERENCES buildtask.builds(id) ON DELETE CASCADE,
    task_order BIGINT NOT NULL,
    task_type TEXT NOT NULL CHECK (task_type IN (
        'BLOCK_SET', 'BLOCK_FILL', 'PREFAB_DOOR', 'PREFAB_STAIRS',
        'PREFAB_WINDOW', 'PREFAB_TORCH', 'PREFAB_SIGN', 'PREFAB_LADDER'
    )),
    task_data JSONB NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('QUEUED', 'EXECUTING', 'COMPLETED', 'FAILED', 'SKIPPED')),
    executed_at TIMESTAMPTZ,
    error_message TEXT,
    description TEXT,
    bounds JSONB,
    UNIQUE (build_id, task_order)
);

CREATE INDEX IF NOT EXISTS idx_buildtask_tasks_build_id ON buildtask.tasks (build_id);
CREATE INDEX IF NOT EXISTS idx_buildtask_builds_world ON buildtask.builds (world);
"#;

struct BuildRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    world: String,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl BuildRow {
    fn into_build(self) -> Result<Build, StoreError> {
        Ok(Build {
            id: self.id,
            name: self.name,
            description: self.description,
            world: self.world,
            status: BuildStatus::from_str(&self.status)
                .map_err(|e| StoreError::Backend(format!("corrupt build status: {e}")))?,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

fn build_row_from(row: &sqlx::postgres::PgRow) -> Result<BuildRow, StoreError> {
    Ok(BuildRow {
        id: row.try_get("id").map_err(sqlx_err)?,
        name: row.try_get("name").map_err(sqlx_err)?,
        description: row.try_get("description").map_err(sqlx_err)?,
        world: row.try_get("world").map_err(sqlx_err)?,
        status: row.try_get("status").map_err(sqlx_err)?,
        created_at: row.try_get("created_at").map_err(sqlx_err)?,
        completed_at: row.try_get("completed_at").map_err(sqlx_err)?,
    })
}

struct TaskRow {
    id: Uuid,
    build_id: Uuid,
    task_order: i64,
    task_type: String,
    task_data: serde_json::Value,
    status: String,
    executed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    description: Option<String>,
    bounds: Option<serde_json::Value>,
}

impl TaskRow {
    fn into_task(self) -> Result<Task, StoreError> {
        let bounds = match self.bounds {
            Some(v) => {
                Some(serde_json::from_value(v).map_err(|e| StoreError::Backend(format!("corrupt bounds: {e}")))?)
            }
            None => None,
        };
        Ok(Task {
            id: self.id,
            build_id: self.build_id,
            task_order: self.task_order,
            task_type: TaskType::from_str(&self.task_type)
                .map_err(|e| StoreError::Backend(format!("corrupt task_type: {e}")))?,
            task_data: self.task_data,
            status: TaskStatus::from_str(&self.status)
                .map_err(|e| StoreError::Backend(format!("corrupt task status: {e}")))?,
            executed_at: self.executed_at,
            error_message: self.error_message,
            description: self.description,
            bounds,
        })
    }
}

fn task_row_from(row: &sqlx::postgres::PgRow) -> Result<TaskRow, StoreError> {
    Ok(TaskRow {
        id: row.try_get("id").map_err(sqlx_err)?,
        build_id: row.try_get("build_id").map_err(sqlx_err)?,
        task_order: row.try_get("task_order").map_err(sqlx_err)?,
        task_type: row.try_get("task_type").map_err(sqlx_err)?,
        task_data: row.try_get("task_data").map_err(sqlx_err)?,
        status: row.try_get("status").map_err(sqlx_err)?,
        executed_at: row.try_get("executed_at").map_err(sqlx_err)?,
        error_message: row.try_get("error_message").map_err(sqlx_err)?,
        description: row.try_get("description").map_err(sqlx_err)?,
        bounds: row.try_get("bounds").map_err(sqlx_err)?,
    })
}

fn sqlx_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn bounds_json(bounds: Option<BoundingBox>) -> Option<serde_json::Value> {
    bounds.map(|b| serde_json::to_value(b).expect("BoundingBox always serializes"))
}

#[async_trait]
impl BuildRepository for PgStore {
    async fn create_build(&self, build: Build) -> Result<Build, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO buildtask.builds (id, name, description, world, status, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, description, world, status, created_at, completed_at
            "#,
        )
        .bind(build.id)
        .bind(&build.name)
        .bind(&build.description)
        .bind(&build.world)
        .bind(build.status.as_str())
        .bind(build.created_at)
        .bind(build.completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_err)?;

        build_row_from(&row)?.into_build()
    }

    async fn get_build(&self, id: Uuid) -> Result<Option<Build>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, description, world, status, created_at, completed_at FROM buildtask.builds WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;

        row.map(|r| build_row_from(&r)?.into_build()).transpose()
    }

    async fn update_build_status(
        &self,
        id: Uuid,
        from: &[BuildStatus],
        to: BuildStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let from_strs: Vec<&'static str> = from.iter().map(BuildStatus::as_str).collect();

        let result = if from_strs.is_empty() {
            sqlx::query("UPDATE buildtask.builds SET status = $1, completed_at = COALESCE($2, completed_at) WHERE id = $3")
                .bind(to.as_str())
                .bind(completed_at)
                .bind(id)
                .execute(&self.pool)
                .await
        } else {
            sqlx::query(
                "UPDATE buildtask.builds SET status = $1, completed_at = COALESCE($2, completed_at) \
                 WHERE id = $3 AND status = ANY($4)",
            )
            .bind(to.as_str())
            .bind(completed_at)
            .bind(id)
            .bind(&from_strs)
            .execute(&self.pool)
            .await
        }
        .map_err(sqlx_err)?;

        if result.rows_affected() == 0 {
            // Distinguish "no such build" from "status precondition failed"
            // so callers get NotFound only when the row is genuinely absent.
            if self.get_build(id).await?.is_none() {
                return Err(StoreError::NotFound);
            }
            return Ok(false);
        }
        Ok(true)
    }

    async fn list_builds_intersecting(&self, world: &str, query: BoundingBox) -> Result<Vec<Build>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT b.id, b.name, b.description, b.world, b.status, b.created_at, b.completed_at
            FROM buildtask.builds b
            JOIN buildtask.tasks t ON t.build_id = b.id
            WHERE b.world = $1
              AND t.bounds IS NOT NULL
              AND (t.bounds->>'min_x')::bigint <= $2 AND (t.bounds->>'max_x')::bigint >= $3
              AND (t.bounds->>'min_y')::bigint <= $4 AND (t.bounds->>'max_y')::bigint >= $5
              AND (t.bounds->>'min_z')::bigint <= $6 AND (t.bounds->>'max_z')::bigint >= $7
            ORDER BY b.created_at ASC, b.id ASC
            "#,
        )
        .bind(world)
        .bind(query.max_x)
        .bind(query.min_x)
        .bind(query.max_y)
        .bind(query.min_y)
        .bind(query.max_z)
        .bind(query.min_z)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter().map(|r| build_row_from(r)?.into_build()).collect()
    }

    async fn add_task_to_end(&self, task: Task) -> Result<Task, StoreError> {
        let mut tx = self.pool.begin().await.map_err(sqlx_err)?;

        let next_order: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(task_order) + 1, 0) FROM buildtask.tasks WHERE build_id = $1",
        )
        .bind(task.build_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(sqlx_err)?;

        let row = sqlx::query(
            r#"
            INSERT INTO buildtask.tasks
                (id, build_id, task_order, task_type, task_data, status, executed_at, error_message, description, bounds)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, build_id, task_order, task_type, task_data, status, executed_at, error_message, description, bounds
            "#,
        )
        .bind(task.id)
        .bind(task.build_id)
        .bind(next_order)
        .bind(task.task_type.as_str())
        .bind(&task.task_data)
        .bind(task.status.as_str())
        .bind(task.executed_at)
        .bind(&task.error_message)
        .bind(&task.description)
        .bind(bounds_json(task.bounds))
        .fetch_one(&mut *tx)
        .await
        .map_err(sqlx_err)?;

        tx.commit().await.map_err(sqlx_err)?;
        task_row_from(&row)?.into_task()
    }

    async fn get_tasks_ordered(&self, build_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, build_id, task_order, task_type, task_data, status, executed_at, error_message, description, bounds
            FROM buildtask.tasks WHERE build_id = $1 ORDER BY task_order ASC
            "#,
        )
        .bind(build_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter().map(|r| task_row_from(r)?.into_task()).collect()
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, build_id, task_order, task_type, task_data, status, executed_at, error_message, description, bounds
            FROM buildtask.tasks WHERE id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;

        row.map(|r| task_row_from(&r)?.into_task()).transpose()
    }

    /// Delete-then-insert inside a single transaction, per the spec's
    /// requirement that queue replacement never observes an intermediate
    /// empty state from outside the transaction.
    async fn replace_task_queue(&self, build_id: Uuid, tasks: Vec<Task>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(sqlx_err)?;

        sqlx::query("DELETE FROM buildtask.tasks WHERE build_id = $1")
            .bind(build_id)
            .execute(&mut *tx)
            .await
            .map_err(sqlx_err)?;

        for task in tasks {
            sqlx::query(
                r#"
                INSERT INTO buildtask.tasks
                    (id, build_id, task_order, task_type, task_data, status, executed_at, error_message, description, bounds)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(task.id)
            .bind(build_id)
            .bind(task.task_order)
            .bind(task.task_type.as_str())
            .bind(&task.task_data)
            .bind(task.status.as_str())
            .bind(task.executed_at)
            .bind(&task.error_message)
            .bind(&task.description)
            .bind(bounds_json(task.bounds))
            .execute(&mut *tx)
            .await
            .map_err(sqlx_err)?;
        }

        tx.commit().await.map_err(sqlx_err)?;
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        executed_at: Option<DateTime<Utc>>,
        error_message: Option<String>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE buildtask.tasks SET status = $1, executed_at = $2, error_message = $3 WHERE id = $4",
        )
        .bind(status.as_str())
        .bind(executed_at)
        .bind(&error_message)
        .bind(task_id)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_task_data(
        &self,
        task_id: Uuid,
        task_data: serde_json::Value,
        description: Option<String>,
        bounds: Option<BoundingBox>,
    ) -> Result<(), StoreError> {
        let result = if description.is_some() {
            sqlx::query("UPDATE buildtask.tasks SET task_data = $1, description = $2, bounds = $3 WHERE id = $4")
                .bind(&task_data)
                .bind(&description)
                .bind(bounds_json(bounds))
                .bind(task_id)
                .execute(&self.pool)
                .await
        } else {
            sqlx::query("UPDATE buildtask.tasks SET task_data = $1, bounds = $2 WHERE id = $3")
                .bind(&task_data)
                .bind(bounds_json(bounds))
                .bind(task_id)
                .execute(&self.pool)
                .await
        }
        .map_err(sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM buildtask.tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_build(&self, id: Uuid) -> Result<(), StoreError> {
        // ON DELETE CASCADE handles the tasks.
        let result = sqlx::query("DELETE FROM buildtask.builds WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_tasks_intersecting(&self, world: &str, query: BoundingBox) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.build_id, t.task_order, t.task_type, t.task_data, t.status,
                   t.executed_at, t.error_message, t.description, t.bounds
            FROM buildtask.tasks t
            JOIN buildtask.builds b ON b.id = t.build_id
            WHERE b.world = $1
              AND t.bounds IS NOT NULL
              AND (t.bounds->>'min_x')::bigint <= $2 AND (t.bounds->>'max_x')::bigint >= $3
              AND (t.bounds->>'min_y')::bigint <= $4 AND (t.bounds->>'max_y')::bigint >= $5
              AND (t.bounds->>'min_z')::bigint <= $6 AND (t.bounds->>'max_z')::bigint >= $7
            ORDER BY t.task_order ASC
            "#,
        )
        .bind(world)
        .bind(query.max_x)
        .bind(query.min_x)
        .bind(query.max_y)
        .bind(query.min_y)
        .bind(query.max_z)
        .bind(query.min_z)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter().map(|r| task_row_from(r)?.into_task()).collect()
    }
}
