//! The Job Store seam.

use async_trait::async_trait;
use lessoncast_core::error::CoreError;
use lessoncast_core::types::{JobId, Timestamp, UserId};

use crate::models::job::{Job, NewJob};

/// Errors raised by a [`JobStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Another writer persisted a newer version first.
    #[error("Job {0} was modified concurrently")]
    Conflict(JobId),

    #[error("Job {0} not found")]
    NotFound(JobId),

    /// A stored row no longer decodes into a [`Job`].
    #[error("Corrupt job row: {0}")]
    Corrupt(String),
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Durable storage for jobs.
///
/// Writers never update in place: they read a [`Job`], change it, and hand
/// it back to [`JobStore::update_if_version`] together with the version they
/// read. A mismatch yields [`StoreError::Conflict`].
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a job by id regardless of entity status.
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Insert a job in `Processing` with version 1.
    async fn create(&self, input: &NewJob) -> Result<Job, StoreError>;

    /// Persist `job` if the stored version is still `expected_version`.
    ///
    /// On success the returned job carries `expected_version + 1` and a
    /// fresh `last_modified_at`.
    async fn update_if_version(&self, job: &Job, expected_version: i64) -> Result<Job, StoreError>;

    /// Permanently remove a job. Returns `false` if it did not exist.
    async fn delete(&self, id: JobId) -> Result<bool, StoreError>;

    /// The owner's Completed, Active jobs, newest first.
    async fn list_completed(
        &self,
        owner_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, StoreError>;

    /// Jobs waiting on a worker (see [`lessoncast_core::state_machine::WORKER_BOUND`])
    /// that have not been modified since `cutoff`, oldest first.
    async fn list_stalled(&self, cutoff: Timestamp, limit: i64) -> Result<Vec<Job>, StoreError>;

    /// Check the backend is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}
