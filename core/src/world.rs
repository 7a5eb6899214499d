//! World-effect ports (C5).
//!
//! Abstract interface to the world-mutation primitives (block-set, box-fill,
//! prefab placement). The real ports enqueue a closure onto the world's
//! single-threaded tick executor and resolve when it runs; this crate only
//! specifies the contract plus a couple of test doubles.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::coordinate::BoundingBox;
use crate::domain::TaskType;

/// Outcome of a single world-effect port call.
#[derive(Debug, Clone)]
pub struct PortResult {
    pub success: bool,
    pub error: Option<String>,
    pub bounds: Option<BoundingBox>,
    pub details: Option<JsonValue>,
}

impl PortResult {
    pub fn ok(bounds: Option<BoundingBox>, details: Option<JsonValue>) -> Self {
        Self {
            success: true,
            error: None,
            bounds,
            details,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            bounds: None,
            details: None,
        }
    }
}

/// Abstract gateway onto the world's serial tick executor. One method per
/// task kind, matching the dispatch table in the task executor (C6).
#[async_trait]
pub trait WorldEffectPort: Send + Sync {
    async fn dispatch(&self, task_type: TaskType, task_data: &JsonValue) -> PortResult;
}

/// A port that always succeeds, echoing back the bbox derived from the
/// payload. Useful for service-level tests that don't care about world
/// mutation, only about status-transition bookkeeping.
pub struct NoopWorldEffectPort;

#[async_trait]
impl WorldEffectPort for NoopWorldEffectPort {
    async fn dispatch(&self, task_type: TaskType, task_data: &JsonValue) -> PortResult {
        let bounds = crate::coordinate::bbox_of(task_type, task_data);
        PortResult::ok(bounds, None)
    }
}

/// A port that always fails with a fixed message. Useful for exercising the
/// executor's failure path and the build service's failure-isolation
/// behavior.
pub struct FailingWorldEffectPort {
    pub message: String,
}

#[async_trait]
impl WorldEffectPort for FailingWorldEffectPort {
    async fn dispatch(&self, _task_type: TaskType, _task_data: &JsonValue) -> PortResult {
        PortResult::failure(self.message.clone())
    }
}

/// A port that never resolves, for exercising the executor's timeout path.
pub struct HangingWorldEffectPort;

#[async_trait]
impl WorldEffectPort for HangingWorldEffectPort {
    async fn dispatch(&self, _task_type: TaskType, _task_data: &JsonValue) -> PortResult {
        std::future::pending::<()>().await;
        unreachable!("pending future never resolves")
    }
}
