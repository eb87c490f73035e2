//! User-facing job operations.
//!
//! Every operation takes the caller explicitly; identity is resolved once
//! by the [`AuthUser`] extractor. Mutations go through
//! [`lessoncast_db::apply_mutation`], and task publishing happens only
//! after the matching mutation committed.

use axum::body::Bytes;
use lessoncast_core::channels::Target;
use lessoncast_core::error::CoreError;
use lessoncast_core::job_events::Notification;
use lessoncast_core::status::ProductType;
use lessoncast_core::tasks::{OutputConfig, TaskMessage};
use lessoncast_core::types::JobId;
use lessoncast_db::models::job::{Job, JobView, NewJob};
use lessoncast_db::{apply_mutation, revert};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::state::AppState;

/// Longest accepted topic, in characters.
pub const MAX_TOPIC_CHARS: usize = 2_000;

/// An uploaded source file, not yet stored.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file_name: String,
    pub data: Bytes,
}

/// Input of [`create_job`].
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub topic: String,
    pub files: Vec<SourceFile>,
}

/// Operations a caller may perform on someone's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Owner or admin.
    Read,
    /// Owner only.
    Modify,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job by ID and verify the caller may act on it.
///
/// Returns `NotFound` if the job does not exist and `Forbidden` if the caller
/// is not the owner (admins may read any job). `action` is used in the error
/// message.
async fn find_and_authorize(
    state: &AppState,
    job_id: JobId,
    caller: &AuthUser,
    access: Access,
    action: &str,
) -> AppResult<Job> {
    let job = state
        .store
        .get(job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    let allowed = job.owner_id == caller.user_id || (access == Access::Read && caller.is_admin());
    if !allowed {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's job"
        ))));
    }

    Ok(job)
}

/// Push the job's current state to its owner on the job-status channel.
async fn push_update(state: &AppState, job: &Job) -> usize {
    state
        .notifications
        .notify(
            &Target::User(job.owner_id),
            &Notification::JobUpdated(job.status_event()),
        )
        .await
}

/// Best-effort removal of uploaded blobs after a failed create or a purge.
async fn discard_blobs(state: &AppState, references: &[String]) {
    for reference in references {
        if let Err(e) = state.blobs.delete(reference).await {
            tracing::warn!(reference = %reference, error = %e, "Failed to delete blob");
        }
    }
}

fn validate_topic(topic: &str) -> Result<String, CoreError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(CoreError::Validation("topic must not be empty".into()));
    }
    if topic.chars().count() > MAX_TOPIC_CHARS {
        return Err(CoreError::Validation(format!(
            "topic must be at most {MAX_TOPIC_CHARS} characters"
        )));
    }
    Ok(topic.to_string())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Store the sources, create the job in `Processing`, and publish the
/// "generate content" task.
///
/// If publishing fails, or `cancel` fires before the task is handed to the
/// broker, the job is deleted and the uploaded blobs are discarded, so no
/// job is left without a task. Once publishing has started it runs to
/// completion.
pub async fn create_job(
    state: &AppState,
    caller: &AuthUser,
    request: CreateJobRequest,
    cancel: &CancellationToken,
) -> AppResult<Job> {
    let topic = validate_topic(&request.topic)?;

    let mut source_refs = Vec::with_capacity(request.files.len());
    for file in request.files {
        if cancel.is_cancelled() {
            discard_blobs(state, &source_refs).await;
            return Err(AppError::Cancelled);
        }
        match state.blobs.put(&file.file_name, file.data).await {
            Ok(reference) => source_refs.push(reference),
            Err(e) => {
                discard_blobs(state, &source_refs).await;
                return Err(e.into());
            }
        }
    }

    let input = NewJob {
        owner_id: caller.user_id,
        topic,
        source_refs,
    };
    let job = match state.store.create(&input).await {
        Ok(job) => job,
        Err(e) => {
            discard_blobs(state, &input.source_refs).await;
            return Err(e.into());
        }
    };

    let outcome = if cancel.is_cancelled() {
        Err(AppError::Cancelled)
    } else {
        let task = TaskMessage::generate_content(job.id, &job.topic, &job.source_refs);
        state.publisher.publish(&task).await.map_err(AppError::from)
    };

    if let Err(err) = outcome {
        tracing::warn!(job_id = %job.id, error = %err, "Create aborted, removing job");
        if let Err(e) = state.store.delete(job.id).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to remove aborted job");
        }
        discard_blobs(state, &job.source_refs).await;
        return Err(err);
    }

    tracing::info!(
        job_id = %job.id,
        user_id = %caller.user_id,
        sources = job.source_refs.len(),
        "Job created",
    );

    Ok(job)
}

// ---------------------------------------------------------------------------
// Confirm
// ---------------------------------------------------------------------------

/// Move a `ContentGenerated` job to `CreatingProduct` and publish the
/// "create product" task.
///
/// A publish failure reverts the transition (unless another writer already
/// moved the job on) and surfaces as `PublishFailure`.
pub async fn confirm_job(
    state: &AppState,
    caller: &AuthUser,
    job_id: JobId,
    product_type: ProductType,
    output_config: OutputConfig,
) -> AppResult<Job> {
    find_and_authorize(state, job_id, caller, Access::Modify, "confirm").await?;

    let mutated = apply_mutation(
        state.store.as_ref(),
        job_id,
        state.conflict_retries(),
        |job| job.confirm(product_type, output_config.clone()),
    )
    .await?;
    let job = &mutated.job;

    let content_ref = job.content_ref.as_deref().ok_or_else(|| {
        AppError::InternalError(format!("Confirmed job {job_id} has no content artifact"))
    })?;
    let task = TaskMessage::create_product(job.id, content_ref, product_type, output_config);

    if let Err(err) = state.publisher.publish(&task).await {
        match revert(state.store.as_ref(), &mutated).await {
            Ok(true) => tracing::warn!(job_id = %job_id, "Confirm reverted after publish failure"),
            Ok(false) => tracing::error!(
                job_id = %job_id,
                "Confirm not reverted after publish failure; job moved on"
            ),
            Err(e) => tracing::error!(job_id = %job_id, error = %e, "Confirm revert failed"),
        }
        return Err(err.into());
    }

    tracing::info!(
        job_id = %job_id,
        user_id = %caller.user_id,
        product_type = %product_type,
        "Job confirmed",
    );
    push_update(state, job).await;

    Ok(mutated.job)
}

// ---------------------------------------------------------------------------
// Get / list
// ---------------------------------------------------------------------------

/// Read-only projection of a job. Admins may read any job.
pub async fn get_job(state: &AppState, caller: &AuthUser, job_id: JobId) -> AppResult<JobView> {
    let job = find_and_authorize(state, job_id, caller, Access::Read, "view").await?;
    Ok(JobView::from(&job))
}

/// The caller's Completed, non-deleted jobs, newest first.
pub async fn list_completed(
    state: &AppState,
    caller: &AuthUser,
    page: &PaginationParams,
) -> AppResult<Vec<JobView>> {
    let jobs = state
        .store
        .list_completed(caller.user_id, page.limit(), page.offset())
        .await?;
    Ok(jobs.iter().map(JobView::from).collect())
}

// ---------------------------------------------------------------------------
// Cancel / delete
// ---------------------------------------------------------------------------

/// Cancel a non-terminal job.
pub async fn cancel_job(state: &AppState, caller: &AuthUser, job_id: JobId) -> AppResult<Job> {
    find_and_authorize(state, job_id, caller, Access::Modify, "cancel").await?;

    let mutated = apply_mutation(
        state.store.as_ref(),
        job_id,
        state.conflict_retries(),
        Job::cancel,
    )
    .await?;

    tracing::info!(job_id = %job_id, user_id = %caller.user_id, "Job cancelled");
    push_update(state, &mutated.job).await;

    Ok(mutated.job)
}

/// Soft-delete a job, or purge it and its source blobs when `permanent`.
pub async fn delete_job(
    state: &AppState,
    caller: &AuthUser,
    job_id: JobId,
    permanent: bool,
) -> AppResult<()> {
    let job = find_and_authorize(state, job_id, caller, Access::Modify, "delete").await?;

    if permanent {
        if state.store.delete(job_id).await? {
            discard_blobs(state, &job.source_refs).await;
        }
        tracing::info!(job_id = %job_id, user_id = %caller.user_id, "Job purged");
    } else {
        apply_mutation(
            state.store.as_ref(),
            job_id,
            state.conflict_retries(),
            |job| Ok(job.soft_delete()),
        )
        .await?;
        tracing::info!(job_id = %job_id, user_id = %caller.user_id, "Job deleted");
    }

    Ok(())
}
