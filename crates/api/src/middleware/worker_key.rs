//! Shared-secret extractor for worker callbacks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use lessoncast_core::api_keys::{shared_secret_matches, WORKER_API_KEY_HEADER};
use lessoncast_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Proof that the request carried the configured worker secret.
///
/// Extraction runs before the path or body is looked at, so a bad key is
/// rejected without revealing whether the job exists.
#[derive(Debug, Clone, Copy)]
pub struct WorkerKey;

impl FromRequestParts<AppState> for WorkerKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(WORKER_API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if shared_secret_matches(&state.config.pipeline.worker_api_key, provided) {
            Ok(WorkerKey)
        } else {
            tracing::warn!(path = %parts.uri.path(), "Rejected worker callback with bad API key");
            Err(AppError::Core(CoreError::Unauthorized(
                "Invalid worker API key".into(),
            )))
        }
    }
}
