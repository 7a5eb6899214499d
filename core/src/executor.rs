//! Task executor (C6).
//!
//! Validates a task's payload, dispatches it to the matching world-effect
//! port, and awaits the result with a timeout. Single-request per call and
//! reentrant; sequencing tasks within a build is the build service's job.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::coordinate::{bbox_of, BoundingBox};
use crate::domain::{Task, TaskType};
use crate::validate;
use crate::world::WorldEffectPort;

pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct TaskExecutionResult {
    pub success: bool,
    pub error_message: Option<String>,
    pub details: Option<JsonValue>,
    pub bounds: Option<BoundingBox>,
}

impl TaskExecutionResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            details: None,
            bounds: None,
        }
    }
}

pub struct TaskExecutor {
    port: Arc<dyn WorldEffectPort>,
    timeout: Duration,
}

impl TaskExecutor {
    pub fn new(port: Arc<dyn WorldEffectPort>) -> Self {
        Self {
            port,
            timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }

    pub fn with_timeout(port: Arc<dyn WorldEffectPort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Executes a single task. Does not persist the status transition; the
    /// caller (build service) writes the post-state returned here.
    pub async fn execute(&self, task_type: TaskType, task_data: &JsonValue) -> TaskExecutionResult {
        if let Err(err) = validate::validate(task_type, task_data) {
            debug!(%task_type, "task validation failed: {err}");
            return TaskExecutionResult::failure(err.to_string());
        }

        let dispatch = self.port.dispatch(task_type, task_data);
        match tokio::time::timeout(self.timeout, dispatch).await {
            Ok(result) if result.success => TaskExecutionResult {
                success: true,
                error_message: None,
                details: result.details,
                bounds: result.bounds.or_else(|| bbox_of(task_type, task_data)),
            },
            Ok(result) => {
                let message = result.error.unwrap_or_else(|| "task execution failed".to_string());
                warn!(%task_type, "world effect port reported failure: {message}");
                TaskExecutionResult::failure(message)
            }
            Err(_) => {
                warn!(%task_type, timeout_secs = self.timeout.as_secs(), "task execution timed out");
                TaskExecutionResult::failure(format!(
                    "task timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            }
        }
    }

    /// Convenience wrapper taking a domain [`Task`] directly.
    pub async fn execute_task(&self, task: &Task) -> TaskExecutionResult {
        self.execute(task.task_type, &task.task_data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{FailingWorldEffectPort, HangingWorldEffectPort, NoopWorldEffectPort};
    use serde_json::json;

    #[tokio::test]
    async fn invalid_payload_fails_before_dispatch() {
        let executor = TaskExecutor::new(Arc::new(NoopWorldEffectPort));
        let result = executor.execute(TaskType::BlockFill, &json!({})).await;
        assert!(!result.success);
        assert!(result.error_message.is_some());
    }

    #[tokio::test]
    async fn valid_payload_succeeds_with_derived_bounds() {
        let executor = TaskExecutor::new(Arc::new(NoopWorldEffectPort));
        let data = json!({
            "x1": 0, "y1": 0, "z1": 0, "x2": 1, "y2": 1, "z2": 1,
            "block_type": "minecraft:stone",
        });
        let result = executor.execute(TaskType::BlockFill, &data).await;
        assert!(result.success);
        assert!(result.bounds.is_some());
    }

    #[tokio::test]
    async fn port_failure_propagates_as_execution_failure() {
        let executor = TaskExecutor::new(Arc::new(FailingWorldEffectPort {
            message: "world rejected write".to_string(),
        }));
        let data = json!({
            "x1": 0, "y1": 0, "z1": 0, "x2": 1, "y2": 1, "z2": 1,
            "block_type": "minecraft:stone",
        });
        let result = executor.execute(TaskType::BlockFill, &data).await;
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("world rejected write"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_surfaces_as_failure() {
        let executor =
            TaskExecutor::with_timeout(Arc::new(HangingWorldEffectPort), Duration::from_millis(10));
        let data = json!({
            "x1": 0, "y1": 0, "z1": 0, "x2": 1, "y2": 1, "z2": 1,
            "block_type": "minecraft:stone",
        });
        let result = executor.execute(TaskType::BlockFill, &data).await;
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("timed out"));
    }
}
