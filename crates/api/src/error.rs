use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lessoncast_core::error::CoreError;
use lessoncast_db::{MutationError, StoreError};
use lessoncast_queue::PublishError;
use serde_json::json;

use crate::storage::StorageError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and the collaborator errors of the
/// job pipeline, and implements [`IntoResponse`] to produce consistent
/// `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `lessoncast_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A Job Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Concurrent writers kept winning; retries were exhausted.
    #[error("Store conflict: {0}")]
    StoreConflict(String),

    /// The broker did not accept a task.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// The blob store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The caller went away before the operation reached a safe point.
    #[error("Request cancelled")]
    Cancelled,

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The upload exceeded `MAX_UPLOAD_BYTES`.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<MutationError> for AppError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::Rejected(core) => Self::Core(core),
            MutationError::Store(store) => Self::Store(store),
            exhausted @ MutationError::Exhausted { .. } => Self::StoreConflict(exhausted.to_string()),
        }
    }
}

fn internal(msg: &dyn std::fmt::Display, context: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::InvalidState(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_STATE", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => internal(msg, "Internal core error"),
            },

            // --- Job Store ---
            AppError::Store(StoreError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Job with id {id} not found"),
            ),
            AppError::Store(StoreError::Conflict(id)) => {
                tracing::error!(job_id = %id, "Unretried store conflict");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_CONFLICT",
                    "The job was modified concurrently; try again".to_string(),
                )
            }
            AppError::Store(err) => internal(err, "Job store error"),
            AppError::StoreConflict(msg) => {
                tracing::error!(error = %msg, "Store conflict retries exhausted");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_CONFLICT",
                    "The job was modified concurrently; try again".to_string(),
                )
            }

            // --- Collaborators ---
            AppError::Publish(err) => {
                tracing::error!(error = %err, "Task publish failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "PUBLISH_FAILED",
                    "The task queue is unavailable".to_string(),
                )
            }
            AppError::Storage(err) => internal(err, "Blob storage error"),

            // --- HTTP-specific errors ---
            AppError::Cancelled => (
                StatusCode::REQUEST_TIMEOUT,
                "CANCELLED",
                "The request was cancelled".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::InternalError(msg) => internal(msg, "Internal error"),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
