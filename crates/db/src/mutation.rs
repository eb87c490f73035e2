//! The load-mutate-persist choke point.
//!
//! Every status change goes through [`apply_mutation`], which checks the
//! job invariants in one place and serializes concurrent writers with the
//! store's version column.

use lessoncast_core::error::CoreError;
use lessoncast_core::state_machine::{self, IgnoreReason};
use lessoncast_core::status::JobStatus;
use lessoncast_core::types::JobId;

use crate::models::job::Job;
use crate::store::{JobStore, StoreError};

/// What a mutator did to the job it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fields changed; persist them.
    Changed,
    /// No field changed, but the job is still persisted so its version and
    /// `last_modified_at` advance (a worker heartbeat).
    Touched,
    /// Nothing to store (e.g. an identical duplicate).
    Unchanged,
    /// Accepted as a benign no-op.
    Ignored(IgnoreReason),
}

/// Result of a mutation: the job as now stored, alongside the snapshot the
/// mutator started from.
#[derive(Debug, Clone)]
pub struct Mutated {
    pub job: Job,
    pub previous: Job,
    pub outcome: Outcome,
}

impl Outcome {
    /// Whether [`apply_mutation`] writes the job back.
    pub fn persists(self) -> bool {
        matches!(self, Self::Changed | Self::Touched)
    }
}

impl Mutated {
    pub fn changed(&self) -> bool {
        self.outcome == Outcome::Changed
    }

    pub fn status_changed(&self) -> bool {
        self.job.status != self.previous.status
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// The mutator or the invariant check refused the change.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Every attempt lost the race to a concurrent writer.
    #[error("Job {id} still conflicted after {attempts} attempts")]
    Exhausted { id: JobId, attempts: u32 },
}

/// Load job `id`, let `mutate` change it, and persist the result atomically.
///
/// On a version conflict the job is reloaded and `mutate` runs again on the
/// fresh copy, up to `max_retries` extra times. When `mutate` returns an
/// outcome that does not [persist](Outcome::persists) nothing is written and
/// the stored job is returned as-is.
pub async fn apply_mutation<F>(
    store: &dyn JobStore,
    id: JobId,
    max_retries: u32,
    mut mutate: F,
) -> Result<Mutated, MutationError>
where
    F: FnMut(&mut Job) -> Result<Outcome, CoreError> + Send,
{
    let mut attempts = 0;
    loop {
        attempts += 1;

        let previous = store
            .get(id)
            .await?
            .ok_or(CoreError::NotFound { entity: "Job", id })?;

        let mut next = previous.clone();
        let outcome = mutate(&mut next)?;
        if !outcome.persists() {
            return Ok(Mutated {
                job: previous.clone(),
                previous,
                outcome,
            });
        }

        check_invariants(&previous, &next)?;

        match store.update_if_version(&next, previous.version).await {
            Ok(job) => {
                return Ok(Mutated {
                    job,
                    previous,
                    outcome,
                })
            }
            Err(StoreError::Conflict(_)) if attempts <= max_retries => {
                tracing::debug!(job_id = %id, attempts, "Version conflict, retrying mutation");
            }
            Err(StoreError::Conflict(_)) => {
                return Err(MutationError::Exhausted { id, attempts });
            }
            Err(StoreError::NotFound(_)) => {
                return Err(CoreError::NotFound { entity: "Job", id }.into());
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Undo a committed mutation by restoring its previous snapshot.
///
/// Only succeeds if nobody else wrote the job since; returns `false` when
/// the job moved on or disappeared.
pub async fn revert(store: &dyn JobStore, mutated: &Mutated) -> Result<bool, StoreError> {
    if !mutated.changed() {
        return Ok(false);
    }
    match store
        .update_if_version(&mutated.previous, mutated.job.version)
        .await
    {
        Ok(_) => Ok(true),
        Err(StoreError::Conflict(_) | StoreError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Invariants that must hold between any stored job and its successor.
fn check_invariants(previous: &Job, next: &Job) -> Result<(), CoreError> {
    if next.id != previous.id
        || next.owner_id != previous.owner_id
        || next.topic != previous.topic
        || next.source_refs != previous.source_refs
        || next.created_at != previous.created_at
    {
        return Err(CoreError::Internal(format!(
            "Mutation of job {} touched an immutable field",
            previous.id
        )));
    }

    if let Some(kind) = previous.product_type {
        if next.product_type != Some(kind) {
            return Err(CoreError::Internal(format!(
                "Product type of job {} is fixed once confirmed",
                previous.id
            )));
        }
    }

    if next.status != previous.status {
        state_machine::validate_transition(previous.status, next.status)?;
    }

    if next.content_ref.is_some() != next.status.holds_content() {
        return Err(CoreError::Internal(format!(
            "Job {} in {} must {}carry a content artifact",
            next.id,
            next.status,
            if next.status.holds_content() { "" } else { "not " }
        )));
    }

    if next.product_type.is_some()
        && matches!(next.status, JobStatus::Processing | JobStatus::ContentGenerated)
    {
        return Err(CoreError::Internal(format!(
            "Job {} has a product type before confirmation",
            next.id
        )));
    }

    if next.status == JobStatus::Completed && next.product_refs.is_empty() {
        return Err(CoreError::Internal(format!(
            "Completed job {} has no product artifact",
            next.id
        )));
    }

    Ok(())
}
