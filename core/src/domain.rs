//! Domain entities (C2): `Build`, `Task`, and their status enumerations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::coordinate::BoundingBox;

pub const DEFAULT_WORLD: &str = "minecraft:overworld";

/// Lifecycle status of a [`Build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Created,
    InProgress,
    Completed,
    Failed,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Created => "CREATED",
            BuildStatus::InProgress => "IN_PROGRESS",
            BuildStatus::Completed => "COMPLETED",
            BuildStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStatus::Completed | BuildStatus::Failed)
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(BuildStatus::Created),
            "IN_PROGRESS" => Ok(BuildStatus::InProgress),
            "COMPLETED" => Ok(BuildStatus::Completed),
            "FAILED" => Ok(BuildStatus::Failed),
            other => Err(format!("unknown build status: {other}")),
        }
    }
}

/// A named, persistent container of ordered tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub world: String,
    pub status: BuildStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Build {
    pub fn new(name: String, description: Option<String>, world: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            world: world.unwrap_or_else(|| DEFAULT_WORLD.to_string()),
            status: BuildStatus::Created,
            created_at,
            completed_at: None,
        }
    }
}

/// Discriminator determining the shape of [`Task::task_data`] and which
/// world-effect port runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    BlockSet,
    BlockFill,
    PrefabDoor,
    PrefabStairs,
    PrefabWindow,
    PrefabTorch,
    PrefabSign,
    PrefabLadder,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::BlockSet => "BLOCK_SET",
            TaskType::BlockFill => "BLOCK_FILL",
            TaskType::PrefabDoor => "PREFAB_DOOR",
            TaskType::PrefabStairs => "PREFAB_STAIRS",
            TaskType::PrefabWindow => "PREFAB_WINDOW",
            TaskType::PrefabTorch => "PREFAB_TORCH",
            TaskType::PrefabSign => "PREFAB_SIGN",
            TaskType::PrefabLadder => "PREFAB_LADDER",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BLOCK_SET" => Ok(TaskType::BlockSet),
            "BLOCK_FILL" => Ok(TaskType::BlockFill),
            "PREFAB_DOOR" => Ok(TaskType::PrefabDoor),
            "PREFAB_STAIRS" => Ok(TaskType::PrefabStairs),
            "PREFAB_WINDOW" => Ok(TaskType::PrefabWindow),
            "PREFAB_TORCH" => Ok(TaskType::PrefabTorch),
            "PREFAB_SIGN" => Ok(TaskType::PrefabSign),
            "PREFAB_LADDER" => Ok(TaskType::PrefabLadder),
            other => Err(format!("unknown task type: {other}")),
        }
    }
}

/// Lifecycle status of a [`Task`]. Moves only along
/// `QUEUED -> EXECUTING -> {COMPLETED, FAILED}`, plus the terminal `SKIPPED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Queued,
    Executing,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Executing => "EXECUTING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Skipped => "SKIPPED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(TaskStatus::Queued),
            "EXECUTING" => Ok(TaskStatus::Executing),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            "SKIPPED" => Ok(TaskStatus::Skipped),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// One world-mutation operation within a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub build_id: Uuid,
    pub task_order: i64,
    pub task_type: TaskType,
    pub task_data: JsonValue,
    pub status: TaskStatus,
    pub executed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub description: Option<String>,
    pub bounds: Option<BoundingBox>,
}

impl Task {
    pub fn new(
        build_id: Uuid,
        task_order: i64,
        task_type: TaskType,
        task_data: JsonValue,
        description: Option<String>,
        bounds: Option<BoundingBox>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            build_id,
            task_order,
            task_type,
            task_data,
            status: TaskStatus::Queued,
            executed_at: None,
            error_message: None,
            description,
            bounds,
        }
    }
}
