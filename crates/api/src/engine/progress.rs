//! Worker progress ingest.
//!
//! Translates a worker status report into a Job Store mutation and a push
//! to the job's owner. Duplicate and out-of-order deliveries resolve to
//! benign no-ops; see [`lessoncast_core::state_machine::decide_worker_update`].

use lessoncast_core::channels::Target;
use lessoncast_core::job_events::Notification;
use lessoncast_core::state_machine::IgnoreReason;
use lessoncast_core::status::JobStatus;
use lessoncast_core::types::JobId;
use lessoncast_db::models::job::{Job, WorkerReport};
use lessoncast_db::{apply_mutation, Outcome};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::state::AppState;

/// Body of `PUT /jobs/{id}/progress`.
///
/// `product_ref` (single) and `product_refs` (list) are both accepted and
/// merged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressUpdate {
    pub status: String,
    pub content_ref: Option<String>,
    pub product_ref: Option<String>,
    #[serde(default)]
    pub product_refs: Vec<String>,
    pub word_count: Option<i32>,
    pub failure_reason: Option<String>,
}

impl ProgressUpdate {
    fn into_report(self) -> AppResult<WorkerReport> {
        let status: JobStatus = self.status.trim().parse()?;
        let mut product_refs = self.product_refs;
        if let Some(single) = self.product_ref {
            if !product_refs.contains(&single) {
                product_refs.insert(0, single);
            }
        }
        Ok(WorkerReport {
            status: Some(status),
            content_ref: self.content_ref,
            product_refs,
            word_count: self.word_count,
            failure_reason: self.failure_reason,
        })
    }
}

/// Acknowledgement returned to the worker.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressAck {
    pub job_id: JobId,
    pub status: JobStatus,
    /// `applied`, `unchanged`, `heartbeat`, `stale` or `already_terminal`.
    pub result: &'static str,
}

fn result_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Changed => "applied",
        Outcome::Touched => IgnoreReason::Heartbeat.as_str(),
        Outcome::Unchanged => "unchanged",
        Outcome::Ignored(reason) => reason.as_str(),
    }
}

/// Apply a worker report to job `job_id`.
///
/// The shared secret has already been checked by the
/// [`WorkerKey`](crate::middleware::worker_key::WorkerKey) extractor.
pub async fn receive_update(
    state: &AppState,
    job_id: JobId,
    update: ProgressUpdate,
) -> AppResult<ProgressAck> {
    let report = update.into_report()?;

    let mutated = apply_mutation(
        state.store.as_ref(),
        job_id,
        state.conflict_retries(),
        |job| job.apply_worker_report(&report),
    )
    .await?;
    let job = &mutated.job;

    match mutated.outcome {
        Outcome::Changed => {
            tracing::info!(
                job_id = %job_id,
                from = %mutated.previous.status,
                to = %job.status,
                "Worker update applied",
            );
            notify_owner(state, job, Notification::JobUpdated(job.status_event())).await;
        }
        Outcome::Touched | Outcome::Ignored(IgnoreReason::Heartbeat) => {
            tracing::debug!(job_id = %job_id, status = %job.status, "Worker heartbeat");
            notify_owner(state, job, Notification::JobProgress(job.status_event())).await;
        }
        outcome => {
            tracing::debug!(
                job_id = %job_id,
                status = %job.status,
                reported = ?report.status,
                result = result_label(outcome),
                "Worker update was a no-op",
            );
        }
    }

    Ok(ProgressAck {
        job_id,
        status: job.status,
        result: result_label(mutated.outcome),
    })
}

async fn notify_owner(state: &AppState, job: &Job, notification: Notification) {
    state
        .notifications
        .notify(&Target::User(job.owner_id), &notification)
        .await;
}
