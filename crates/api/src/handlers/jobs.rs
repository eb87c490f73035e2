//! Handlers for the `/jobs` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Owners may act on
//! their own jobs; admins may additionally read any job.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lessoncast_core::status::ProductType;
use lessoncast_core::tasks::OutputConfig;
use lessoncast_core::types::JobId;
use lessoncast_db::models::job::JobView;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::engine::lifecycle::{self, CreateJobRequest, SourceFile};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{DeleteParams, PaginationParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /jobs/{id}/confirm`.
#[derive(Debug, Deserialize)]
pub struct ConfirmJobRequest {
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub output_config: OutputConfig,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Multipart form with a `topic` text field and zero or more `files`
/// (`file` is accepted too). Returns 201 with the created job.
///
/// The work runs on its own task holding a cancellation token that fires
/// when this handler is dropped (client disconnect or request timeout), so
/// an abandoned create is rolled back instead of being cut off mid-way.
pub async fn create_job(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let request = read_create_form(multipart).await?;

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let task = tokio::spawn(async move {
        lifecycle::create_job(&state, &auth, request, &cancel).await
    });
    let job = task
        .await
        .map_err(|e| AppError::InternalError(format!("Create task failed: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: JobView::from(&job),
        }),
    ))
}

async fn read_create_form(mut multipart: Multipart) -> AppResult<CreateJobRequest> {
    let mut topic: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(form_error)?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "topic" => {
                let text = field.text().await.map_err(form_error)?;
                topic = Some(text);
            }
            "files" | "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(form_error)?;
                files.push(SourceFile { file_name, data });
            }
            _ => {} // ignore unknown fields
        }
    }

    let topic = topic.ok_or_else(|| AppError::BadRequest("Missing required 'topic' field".into()))?;
    Ok(CreateJobRequest { topic, files })
}

fn form_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

// ---------------------------------------------------------------------------
// Confirm
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/confirm
///
/// Choose the product type for a `ContentGenerated` job. Any other status
/// is rejected with 400 `INVALID_STATE` and nothing is published.
pub async fn confirm_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Json(input): Json<ConfirmJobRequest>,
) -> AppResult<impl IntoResponse> {
    let product_type: ProductType = input.product_type.trim().to_ascii_lowercase().parse()?;
    let job =
        lifecycle::confirm_job(&state, &auth, job_id, product_type, input.output_config).await?;
    Ok(Json(DataResponse {
        data: JobView::from(&job),
    }))
}

// ---------------------------------------------------------------------------
// Get / list
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let view = lifecycle::get_job(&state, &auth, job_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/jobs/completed
pub async fn list_completed(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let jobs = lifecycle::list_completed(&state, &auth, &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

// ---------------------------------------------------------------------------
// Cancel / delete
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/cancel
///
/// Cancel a non-terminal job. A terminal job yields 400 `INVALID_STATE`.
pub async fn cancel_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = lifecycle::cancel_job(&state, &auth, job_id).await?;
    Ok(Json(DataResponse {
        data: JobView::from(&job),
    }))
}

/// DELETE /api/v1/jobs/{id}[?permanent=true]
///
/// Soft delete by default; `permanent=true` purges the job. Returns 204.
pub async fn delete_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Query(params): Query<DeleteParams>,
) -> AppResult<impl IntoResponse> {
    lifecycle::delete_job(&state, &auth, job_id, params.permanent).await?;
    Ok(StatusCode::NO_CONTENT)
}
