//! Transport-boundary error mapping, mirroring the teacher's
//! `WorkflowApiError`: wrap the core crate's error enums and translate them
//! to a JSON body plus an HTTP status code in one place.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use buildtask_core::{ServiceError, StoreError};
use serde_json::json;

pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ServiceError::BuildNotFound(_) | ServiceError::TaskNotFound(_) => {
                (StatusCode::NOT_FOUND, self.0.to_string())
            }
            ServiceError::TaskNotInBuild { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            ServiceError::BuildCompleted(_) => (StatusCode::CONFLICT, self.0.to_string()),
            ServiceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ServiceError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string()),
            ServiceError::Storage(StoreError::NotFound) => (StatusCode::NOT_FOUND, self.0.to_string()),
            ServiceError::Storage(StoreError::Conflict(_)) => (StatusCode::CONFLICT, self.0.to_string()),
            ServiceError::Storage(StoreError::Backend(_)) => {
                tracing::error!(error = %self.0, "storage backend error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal storage error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
