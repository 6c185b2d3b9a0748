use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use store::StoreError;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
    Store(StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            AppError::Store(err) => {
                tracing::error!("Store error: {:?}", err);
                match err {
                    StoreError::PlanNotFound(id) => (
                        StatusCode::NOT_FOUND,
                        "not_found",
                        format!("Plan not found: {}", id),
                    ),
                    StoreError::TaskNotFound(id) => (
                        StatusCode::NOT_FOUND,
                        "not_found",
                        format!("Task not found: {}", id),
                    ),
                    StoreError::InvalidTransition { from, to } => (
                        StatusCode::CONFLICT,
                        "conflict",
                        format!("Invalid state transition from {} to {}", from, to),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "store_error",
                        "Store error occurred".to_string(),
                    ),
                }
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}
