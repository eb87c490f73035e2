//! In-process [`JobStore`] for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use lessoncast_core::state_machine;
use lessoncast_core::status::{EntityStatus, JobStatus};
use lessoncast_core::types::{JobId, Timestamp, UserId};
use tokio::sync::RwLock;

use crate::models::job::{Job, NewJob};
use crate::store::{JobStore, StoreError};

/// Jobs held in a map behind an async lock.
///
/// Applies the same version check as the Postgres store, so concurrency
/// behaviour can be exercised without a database.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    forced_conflicts: AtomicU32,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a job verbatim.
    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id, job);
    }

    /// Make the next `count` versioned updates fail with a conflict.
    pub fn fail_next_updates(&self, count: u32) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn create(&self, input: &NewJob) -> Result<Job, StoreError> {
        let now = Utc::now();
        let job = Job {
            id: uuid::Uuid::now_v7(),
            owner_id: input.owner_id,
            status: JobStatus::Processing,
            product_type: None,
            topic: input.topic.clone(),
            source_refs: input.source_refs.clone(),
            content_ref: None,
            product_refs: Vec::new(),
            word_count: None,
            failure_reason: None,
            output_config: None,
            entity_status: EntityStatus::Active,
            version: 1,
            created_at: now,
            last_modified_at: now,
        };
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn update_if_version(&self, job: &Job, expected_version: i64) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let stored = jobs.get_mut(&job.id).ok_or(StoreError::NotFound(job.id))?;

        if self.take_forced_conflict() || stored.version != expected_version {
            return Err(StoreError::Conflict(job.id));
        }

        let mut next = job.clone();
        next.version = expected_version + 1;
        next.last_modified_at = Utc::now().max(stored.last_modified_at);
        *stored = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: JobId) -> Result<bool, StoreError> {
        Ok(self.jobs.write().await.remove(&id).is_some())
    }

    async fn list_completed(
        &self,
        owner_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut completed: Vec<Job> = jobs
            .values()
            .filter(|j| {
                j.owner_id == owner_id
                    && j.status == JobStatus::Completed
                    && j.entity_status == EntityStatus::Active
            })
            .cloned()
            .collect();
        completed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(completed
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_stalled(&self, cutoff: Timestamp, limit: i64) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut stalled: Vec<Job> = jobs
            .values()
            .filter(|j| state_machine::awaits_worker(j.status) && j.last_modified_at < cutoff)
            .cloned()
            .collect();
        stalled.sort_by(|a, b| a.last_modified_at.cmp(&b.last_modified_at));
        stalled.truncate(limit.max(0) as usize);
        Ok(stalled)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
