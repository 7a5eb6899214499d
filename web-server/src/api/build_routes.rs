//! Build and task lifecycle routes, grouped the way the teacher's
//! `entity_routes.rs` groups CRUD endpoints for one resource family.

use axum::{
    extract::{Path, State},
    routing::{get, patch, post, put},
    Json, Router,
};
use buildtask_core::{BuildExecutionSummary, Build, Task, TaskType};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn create_build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/builds", post(create_build))
        .route("/api/builds/:build_id", get(get_build))
        .route("/api/builds/:build_id", axum::routing::delete(delete_build))
        .route("/api/builds/:build_id/tasks", get(list_tasks).post(append_task))
        .route("/api/builds/:build_id/tasks/:position", post(insert_task_at))
        .route(
            "/api/builds/:build_id/tasks/:task_id",
            patch(patch_task).delete(delete_task),
        )
        .route("/api/builds/:build_id/tasks/queue", put(replace_queue))
        .route("/api/builds/:build_id/execute", post(execute_build))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateBuildRequest {
    name: String,
    description: Option<String>,
    world: Option<String>,
}

async fn create_build(
    State(state): State<AppState>,
    Json(body): Json<CreateBuildRequest>,
) -> Result<Json<Build>, ApiError> {
    let build = state.service.create_build(body.name, body.description, body.world).await?;
    Ok(Json(build))
}

async fn get_build(
    State(state): State<AppState>,
    Path(build_id): Path<Uuid>,
) -> Result<Json<Build>, ApiError> {
    Ok(Json(state.service.get_build(build_id).await?))
}

async fn delete_build(
    State(state): State<AppState>,
    Path(build_id): Path<Uuid>,
) -> Result<Json<JsonValue>, ApiError> {
    state.service.delete_build(build_id).await?;
    Ok(Json(serde_json::json!({ "deleted": build_id })))
}

async fn list_tasks(
    State(state): State<AppState>,
    Path(build_id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.service.list_tasks(build_id).await?))
}

#[derive(Debug, Deserialize)]
struct TaskRequest {
    task_type: TaskType,
    task_data: JsonValue,
    description: Option<String>,
}

async fn append_task(
    State(state): State<AppState>,
    Path(build_id): Path<Uuid>,
    Json(body): Json<TaskRequest>,
) -> Result<Json<Task>, ApiError> {
    debug!(build_id = %build_id, task_type = ?body.task_type, "append task requested");
    let task = state
        .service
        .add_task(build_id, body.task_type, body.task_data, body.description)
        .await?;
    Ok(Json(task))
}

async fn insert_task_at(
    State(state): State<AppState>,
    Path((build_id, position)): Path<(Uuid, usize)>,
    Json(body): Json<TaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .service
        .insert_task_at(build_id, position, body.task_type, body.task_data, body.description)
        .await?;
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
struct PatchTaskRequest {
    task_data: Option<JsonValue>,
    description: Option<String>,
}

async fn patch_task(
    State(state): State<AppState>,
    Path((build_id, task_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<PatchTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .service
        .patch_task(build_id, task_id, body.task_data, body.description)
        .await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Path((build_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<JsonValue>, ApiError> {
    state.service.delete_task(build_id, task_id).await?;
    Ok(Json(serde_json::json!({ "deleted": task_id })))
}

#[derive(Debug, Deserialize)]
struct ReplaceQueueRequest {
    ordered_task_ids: Vec<Uuid>,
}

async fn replace_queue(
    State(state): State<AppState>,
    Path(build_id): Path<Uuid>,
    Json(body): Json<ReplaceQueueRequest>,
) -> Result<Json<JsonValue>, ApiError> {
    state.service.reorder_queue(build_id, body.ordered_task_ids).await?;
    Ok(Json(serde_json::json!({ "reordered": build_id })))
}

async fn execute_build(
    State(state): State<AppState>,
    Path(build_id): Path<Uuid>,
) -> Result<Json<BuildExecutionSummary>, ApiError> {
    let summary = state.service.execute_build(build_id).await?;
    Ok(Json(summary))
}
