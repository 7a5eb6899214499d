//! Spatial query and audit routes (C8), mirroring the teacher's
//! `workflow_routes.rs` grouping for cross-cutting, read-only endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use buildtask_core::{AuditReport, BoundingBox, LocationQueryResult};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn create_location_router(state: AppState) -> Router {
    Router::new()
        .route("/api/location", get(query_by_location))
        .route("/api/builds/:build_id/audit", get(audit_build))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LocationQuery {
    world: String,
    min_x: i64,
    min_y: i64,
    min_z: i64,
    max_x: i64,
    max_y: i64,
    max_z: i64,
    #[serde(default)]
    include_in_progress: bool,
}

async fn query_by_location(
    State(state): State<AppState>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<LocationQueryResult>, ApiError> {
    let query = BoundingBox::from_corners(
        params.min_x,
        params.min_y,
        params.min_z,
        params.max_x,
        params.max_y,
        params.max_z,
    );
    let result = state
        .location
        .query_by_location(&params.world, query, params.include_in_progress)
        .await?;
    Ok(Json(result))
}

async fn audit_build(
    State(state): State<AppState>,
    Path(build_id): Path<Uuid>,
) -> Result<Json<AuditReport>, ApiError> {
    let report = state.location.audit_build(build_id).await?;
    Ok(Json(report))
}
