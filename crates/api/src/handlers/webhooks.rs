//! Worker callback endpoint.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use lessoncast_core::types::JobId;

use crate::engine::progress::{self, ProgressUpdate};
use crate::error::AppResult;
use crate::middleware::worker_key::WorkerKey;
use crate::response::DataResponse;
use crate::state::AppState;

/// PUT /api/v1/jobs/{id}/progress
///
/// Requires `X-API-Key`. Returns 200 for applied updates and benign
/// duplicates alike, 401 for a bad key (checked first), 404 for an unknown
/// job and 400 for a status that is illegal from the job's current one.
pub async fn receive_progress(
    _key: WorkerKey,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Json(update): Json<ProgressUpdate>,
) -> AppResult<impl IntoResponse> {
    let ack = progress::receive_update(&state, job_id, update).await?;
    Ok(Json(DataResponse { data: ack }))
}
