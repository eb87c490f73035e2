pub mod health;
pub mod jobs;

use axum::routing::get;
use axum::Router;

use crate::config::PipelineConfig;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws/jobs                          job-status WebSocket (?token=)
/// /ws/content                       content/discussion WebSocket (?token=)
///
/// /jobs                             create (multipart POST)
/// /jobs/completed                   caller's completed jobs (GET)
/// /jobs/{id}                        get, delete (GET, DELETE ?permanent)
/// /jobs/{id}/confirm                choose product type (POST)
/// /jobs/{id}/cancel                 cancel job (POST)
/// /jobs/{id}/progress               worker progress webhook (PUT, X-API-Key)
/// ```
pub fn api_routes(pipeline: &PipelineConfig) -> Router<AppState> {
    Router::new()
        // WebSocket endpoints, one per notification channel.
        .route("/ws/jobs", get(ws::job_ws_handler))
        .route("/ws/content", get(ws::content_ws_handler))
        // Job lifecycle and worker callbacks.
        .nest("/jobs", jobs::router(pipeline.max_upload_bytes))
}
