//! Route definitions for the `/jobs` resource.
//!
//! User endpoints require a bearer token; `/{id}/progress` requires the
//! worker API key instead.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{jobs, webhooks};
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST   /                -> create_job
/// GET    /completed       -> list_completed
/// GET    /{id}            -> get_job
/// DELETE /{id}            -> delete_job
/// POST   /{id}/confirm    -> confirm_job
/// POST   /{id}/cancel     -> cancel_job
/// PUT    /{id}/progress   -> receive_progress
/// ```
///
/// Only the multipart create accepts bodies up to `max_upload_bytes`; every
/// other route keeps axum's default JSON limit.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(jobs::create_job).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/completed", get(jobs::list_completed))
        .route("/{id}", get(jobs::get_job).delete(jobs::delete_job))
        .route("/{id}/confirm", post(jobs::confirm_job))
        .route("/{id}/cancel", post(jobs::cancel_job))
        .route("/{id}/progress", put(webhooks::receive_progress))
}
