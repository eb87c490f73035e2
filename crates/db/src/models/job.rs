//! Job entity, its row mapping, and the field-level effects of each
//! state-machine transition.

use lessoncast_core::error::CoreError;
use lessoncast_core::job_events::JobStatusEvent;
use lessoncast_core::state_machine::{self, IgnoreReason, WorkerDecision};
use lessoncast_core::status::{EntityStatus, JobStatus, ProductType, StatusId};
use lessoncast_core::tasks::OutputConfig;
use lessoncast_core::types::{JobId, Timestamp, UserId};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::mutation::Outcome;

/// Failure reason stored when a worker reports `Failed` without one.
pub const DEFAULT_FAILURE_REASON: &str = "The worker reported a failure without a reason";

/// Failure reason stored by the expiry sweep.
pub const EXPIRED_REASON: &str = "Job exceeded the processing time limit";

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: JobId,
    pub owner_id: UserId,
    pub status_id: StatusId,
    pub product_type_id: Option<StatusId>,
    pub topic: String,
    pub source_refs: Vec<String>,
    pub content_ref: Option<String>,
    pub product_refs: Vec<String>,
    pub word_count: Option<i32>,
    pub failure_reason: Option<String>,
    pub output_config: Option<Json<OutputConfig>>,
    pub entity_status_id: StatusId,
    pub version: i64,
    pub created_at: Timestamp,
    pub last_modified_at: Timestamp,
}

/// The unit of work.
///
/// `version` is the optimistic-concurrency token; it increases by one on
/// every persisted mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub owner_id: UserId,
    pub status: JobStatus,
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
    pub topic: String,
    pub source_refs: Vec<String>,
    pub content_ref: Option<String>,
    pub product_refs: Vec<String>,
    pub word_count: Option<i32>,
    pub failure_reason: Option<String>,
    pub output_config: Option<OutputConfig>,
    pub entity_status: EntityStatus,
    pub version: i64,
    pub created_at: Timestamp,
    pub last_modified_at: Timestamp,
}

impl TryFrom<JobRow> for Job {
    type Error = CoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            status: JobStatus::from_id(row.status_id)?,
            product_type: row.product_type_id.map(ProductType::from_id).transpose()?,
            topic: row.topic,
            source_refs: row.source_refs,
            content_ref: row.content_ref,
            product_refs: row.product_refs,
            word_count: row.word_count,
            failure_reason: row.failure_reason,
            output_config: row.output_config.map(|Json(config)| config),
            entity_status: EntityStatus::from_id(row.entity_status_id)?,
            version: row.version,
            created_at: row.created_at,
            last_modified_at: row.last_modified_at,
        })
    }
}

/// DTO for inserting a new job. The store assigns id, status and timestamps.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub owner_id: UserId,
    pub topic: String,
    pub source_refs: Vec<String>,
}

/// A status report from a worker, already parsed from the webhook body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerReport {
    pub status: Option<JobStatus>,
    pub content_ref: Option<String>,
    pub product_refs: Vec<String>,
    pub word_count: Option<i32>,
    pub failure_reason: Option<String>,
}

/// Read-only projection returned by `GET /jobs/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub owner_id: UserId,
    pub status: JobStatus,
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
    pub topic: String,
    pub source_refs: Vec<String>,
    pub content_ref: Option<String>,
    pub product_refs: Vec<String>,
    pub word_count: Option<i32>,
    pub failure_reason: Option<String>,
    pub output_config: Option<OutputConfig>,
    pub entity_status: EntityStatus,
    pub created_at: Timestamp,
    pub last_modified_at: Timestamp,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            owner_id: job.owner_id,
            status: job.status,
            product_type: job.product_type,
            topic: job.topic.clone(),
            source_refs: job.source_refs.clone(),
            content_ref: job.content_ref.clone(),
            product_refs: job.product_refs.clone(),
            word_count: job.word_count,
            failure_reason: job.failure_reason.clone(),
            output_config: job.output_config.clone(),
            entity_status: job.entity_status,
            created_at: job.created_at,
            last_modified_at: job.last_modified_at,
        }
    }
}

impl Job {
    /// Payload for a job-status push.
    pub fn status_event(&self) -> JobStatusEvent {
        JobStatusEvent {
            job_id: self.id,
            status: self.status,
            product_type: self.product_type,
            content_ref: self.content_ref.clone(),
            product_refs: self.product_refs.clone(),
            word_count: self.word_count,
            failure_reason: self.failure_reason.clone(),
            last_modified_at: self.last_modified_at,
        }
    }

    /// Apply a worker report according to [`state_machine::decide_worker_update`].
    pub fn apply_worker_report(&mut self, report: &WorkerReport) -> Result<Outcome, CoreError> {
        let reported = report
            .status
            .ok_or_else(|| CoreError::Validation("status is required".into()))?;

        match state_machine::decide_worker_update(self.status, reported)? {
            // A progress ping proves the worker is alive; persist it so the
            // sweep sees a fresh `last_modified_at`.
            WorkerDecision::Ignore(IgnoreReason::Heartbeat) => Ok(Outcome::Touched),
            WorkerDecision::Ignore(reason) => Ok(Outcome::Ignored(reason)),
            WorkerDecision::Refresh => self.refresh_content(report),
            WorkerDecision::Transition(JobStatus::ContentGenerated) => {
                let content_ref = required_ref(report.content_ref.as_deref(), "content_ref")?;
                self.content_ref = Some(content_ref);
                self.word_count = report.word_count;
                self.status = JobStatus::ContentGenerated;
                Ok(Outcome::Changed)
            }
            WorkerDecision::Transition(JobStatus::Completed) => {
                if report.product_refs.iter().all(|r| r.trim().is_empty()) {
                    return Err(CoreError::Validation(
                        "product_ref is required when reporting Completed".into(),
                    ));
                }
                self.product_refs = report
                    .product_refs
                    .iter()
                    .filter(|r| !r.trim().is_empty())
                    .cloned()
                    .collect();
                self.status = JobStatus::Completed;
                Ok(Outcome::Changed)
            }
            WorkerDecision::Transition(JobStatus::Failed) => {
                let reason = report
                    .failure_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(DEFAULT_FAILURE_REASON);
                self.end_without_product(JobStatus::Failed, Some(reason.to_string()));
                Ok(Outcome::Changed)
            }
            WorkerDecision::Transition(other) => Err(CoreError::InvalidState(format!(
                "Workers cannot move a job to {other}"
            ))),
        }
    }

    /// Same-status `ContentGenerated` report: last write wins on artifacts.
    fn refresh_content(&mut self, report: &WorkerReport) -> Result<Outcome, CoreError> {
        if report.content_ref.is_none() && report.word_count.is_none() {
            return Ok(Outcome::Ignored(IgnoreReason::Heartbeat));
        }

        let mut changed = false;
        if let Some(content_ref) = report.content_ref.as_deref() {
            let content_ref = required_ref(Some(content_ref), "content_ref")?;
            if self.content_ref.as_deref() != Some(content_ref.as_str()) {
                self.content_ref = Some(content_ref);
                changed = true;
            }
        }
        if report.word_count.is_some() && report.word_count != self.word_count {
            self.word_count = report.word_count;
            changed = true;
        }

        Ok(if changed {
            Outcome::Changed
        } else {
            Outcome::Unchanged
        })
    }

    /// User confirmation: fix the product type and start product creation.
    pub fn confirm(
        &mut self,
        product_type: ProductType,
        output_config: OutputConfig,
    ) -> Result<Outcome, CoreError> {
        state_machine::check_confirm(self.status)?;
        if self.content_ref.is_none() {
            return Err(CoreError::Internal(format!(
                "Job {} is ContentGenerated without a content artifact",
                self.id
            )));
        }
        self.product_type = Some(product_type);
        self.output_config = Some(output_config);
        self.status = JobStatus::CreatingProduct;
        Ok(Outcome::Changed)
    }

    /// User cancellation from any non-terminal status.
    pub fn cancel(&mut self) -> Result<Outcome, CoreError> {
        state_machine::check_cancel(self.status)?;
        self.end_without_product(JobStatus::Cancelled, None);
        Ok(Outcome::Changed)
    }

    /// Timeout sweep: expire the job if it has not moved since `cutoff`.
    ///
    /// Re-checked inside the mutation so a webhook that lands between the
    /// sweep's listing and this call keeps the job alive. Jobs waiting on
    /// their owner's confirmation are left alone.
    pub fn expire_if_stalled(&mut self, cutoff: Timestamp) -> Result<Outcome, CoreError> {
        if self.status.is_terminal() {
            return Ok(Outcome::Ignored(IgnoreReason::AlreadyTerminal));
        }
        if !state_machine::awaits_worker(self.status) || self.last_modified_at >= cutoff {
            return Ok(Outcome::Unchanged);
        }
        state_machine::check_expire(self.status)?;
        self.end_without_product(JobStatus::Expired, Some(EXPIRED_REASON.to_string()));
        Ok(Outcome::Changed)
    }

    /// Hide the job from listings. Processing status is untouched.
    pub fn soft_delete(&mut self) -> Outcome {
        if self.entity_status == EntityStatus::Deleted {
            Outcome::Unchanged
        } else {
            self.entity_status = EntityStatus::Deleted;
            Outcome::Changed
        }
    }

    /// Enter Failed, Expired or Cancelled. Content is only held by
    /// ContentGenerated, CreatingProduct and Completed jobs.
    fn end_without_product(&mut self, status: JobStatus, reason: Option<String>) {
        self.status = status;
        self.content_ref = None;
        if reason.is_some() {
            self.failure_reason = reason;
        }
    }
}

fn required_ref(value: Option<&str>, field: &str) -> Result<String, CoreError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CoreError::Validation(format!(
            "{field} is required for this status"
        ))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;

    use super::*;

    pub(crate) fn processing_job() -> Job {
        let now = chrono::Utc::now();
        Job {
            id: uuid::Uuid::now_v7(),
            owner_id: uuid::Uuid::new_v4(),
            status: JobStatus::Processing,
            product_type: None,
            topic: "Cells".into(),
            source_refs: vec!["f1.pdf".into()],
            content_ref: None,
            product_refs: Vec::new(),
            word_count: None,
            failure_reason: None,
            output_config: None,
            entity_status: EntityStatus::Active,
            version: 1,
            created_at: now,
            last_modified_at: now,
        }
    }

    fn report(status: JobStatus) -> WorkerReport {
        WorkerReport {
            status: Some(status),
            ..Default::default()
        }
    }

    #[test]
    fn content_ready_stores_ref_and_word_count() {
        let mut job = processing_job();
        let outcome = job
            .apply_worker_report(&WorkerReport {
                content_ref: Some("c1".into()),
                word_count: Some(500),
                ..report(JobStatus::ContentGenerated)
            })
            .unwrap();

        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(job.status, JobStatus::ContentGenerated);
        assert_eq!(job.content_ref.as_deref(), Some("c1"));
        assert_eq!(job.word_count, Some(500));
    }

    #[test]
    fn content_ready_without_ref_is_rejected() {
        let mut job = processing_job();
        let before = job.clone();
        let err = job
            .apply_worker_report(&report(JobStatus::ContentGenerated))
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
        assert_eq!(job, before);
    }

    #[test]
    fn identical_duplicate_content_is_unchanged() {
        let mut job = processing_job();
        let update = WorkerReport {
            content_ref: Some("c1".into()),
            word_count: Some(500),
            ..report(JobStatus::ContentGenerated)
        };
        job.apply_worker_report(&update).unwrap();
        assert_eq!(job.apply_worker_report(&update).unwrap(), Outcome::Unchanged);
    }

    #[test]
    fn newer_duplicate_content_overwrites() {
        let mut job = processing_job();
        job.apply_worker_report(&WorkerReport {
            content_ref: Some("c1".into()),
            ..report(JobStatus::ContentGenerated)
        })
        .unwrap();
        let outcome = job
            .apply_worker_report(&WorkerReport {
                content_ref: Some("c2".into()),
                ..report(JobStatus::ContentGenerated)
            })
            .unwrap();
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(job.content_ref.as_deref(), Some("c2"));
    }

    #[test]
    fn failure_stores_reason_and_drops_content() {
        let mut job = processing_job();
        job.apply_worker_report(&WorkerReport {
            content_ref: Some("c1".into()),
            ..report(JobStatus::ContentGenerated)
        })
        .unwrap();

        job.apply_worker_report(&WorkerReport {
            failure_reason: Some("model overloaded".into()),
            ..report(JobStatus::Failed)
        })
        .unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_reason.as_deref(), Some("model overloaded"));
        assert!(job.content_ref.is_none());
    }

    #[test]
    fn failure_without_reason_gets_default() {
        let mut job = processing_job();
        job.apply_worker_report(&report(JobStatus::Failed)).unwrap();
        assert_eq!(job.failure_reason.as_deref(), Some(DEFAULT_FAILURE_REASON));
    }

    #[test]
    fn missing_status_is_a_validation_error() {
        let mut job = processing_job();
        assert_matches!(
            job.apply_worker_report(&WorkerReport::default()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn confirm_only_from_content_generated() {
        let mut job = processing_job();
        let before = job.clone();
        assert_matches!(
            job.confirm(ProductType::Video, OutputConfig::default()),
            Err(CoreError::InvalidState(_))
        );
        assert_eq!(job, before);

        job.status = JobStatus::ContentGenerated;
        job.content_ref = Some("c1".into());
        job.confirm(ProductType::Video, OutputConfig::default()).unwrap();
        assert_eq!(job.status, JobStatus::CreatingProduct);
        assert_eq!(job.product_type, Some(ProductType::Video));

        assert_matches!(
            job.confirm(ProductType::Audio, OutputConfig::default()),
            Err(CoreError::InvalidState(_))
        );
        assert_eq!(job.product_type, Some(ProductType::Video));
    }

    #[test]
    fn product_ready_completes_creating_product_job() {
        let mut job = processing_job();
        job.status = JobStatus::CreatingProduct;
        job.content_ref = Some("c1".into());
        job.product_type = Some(ProductType::Audio);

        job.apply_worker_report(&WorkerReport {
            product_refs: vec!["p1.mp3".into()],
            ..report(JobStatus::Completed)
        })
        .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.product_refs, vec!["p1.mp3".to_string()]);
        assert_eq!(job.content_ref.as_deref(), Some("c1"));
    }

    #[test]
    fn expire_respects_cutoff() {
        let mut job = processing_job();
        let cutoff = job.last_modified_at - chrono::Duration::seconds(1);
        assert_eq!(job.expire_if_stalled(cutoff).unwrap(), Outcome::Unchanged);

        let cutoff = job.last_modified_at + chrono::Duration::seconds(1);
        assert_eq!(job.expire_if_stalled(cutoff).unwrap(), Outcome::Changed);
        assert_eq!(job.status, JobStatus::Expired);
        assert_eq!(job.failure_reason.as_deref(), Some(EXPIRED_REASON));
    }

    #[test]
    fn expire_leaves_jobs_awaiting_confirmation() {
        let mut job = processing_job();
        job.status = JobStatus::ContentGenerated;
        job.content_ref = Some("c1".into());
        let before = job.clone();

        let cutoff = job.last_modified_at + chrono::Duration::hours(1);
        assert_eq!(job.expire_if_stalled(cutoff).unwrap(), Outcome::Unchanged);
        assert_eq!(job, before);
    }

    #[test]
    fn progress_ping_touches_the_job() {
        let mut job = processing_job();
        job.status = JobStatus::CreatingProduct;
        job.content_ref = Some("c1".into());
        job.product_type = Some(ProductType::Video);
        let before = job.clone();

        let outcome = job
            .apply_worker_report(&report(JobStatus::CreatingProduct))
            .unwrap();
        assert_eq!(outcome, Outcome::Touched);
        assert_eq!(job, before);
    }

    #[test]
    fn soft_delete_is_independent_of_status() {
        let mut job = processing_job();
        assert_eq!(job.soft_delete(), Outcome::Changed);
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.soft_delete(), Outcome::Unchanged);
    }
}
