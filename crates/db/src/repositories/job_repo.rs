//! Postgres [`JobStore`] over the `jobs` table.
//!
//! Status, entity status and product type are stored as SMALLINT ids from
//! `lessoncast_core::status`. Every update is a compare-and-swap on the
//! `version` column.

use async_trait::async_trait;
use lessoncast_core::status::{EntityStatus, JobStatus, StatusId};
use lessoncast_core::types::{JobId, Timestamp, UserId};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::job::{Job, JobRow, NewJob};
use crate::store::{JobStore, StoreError};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, owner_id, status_id, product_type_id, topic, source_refs, \
    content_ref, product_refs, word_count, failure_reason, output_config, \
    entity_status_id, version, created_at, last_modified_at";

/// Statuses the expiry sweep may act on. Must match `idx_jobs_stalled`.
const WORKER_BOUND_STATUSES: [StatusId; 2] = [
    JobStatus::Processing as StatusId,
    JobStatus::CreatingProduct as StatusId,
];

/// Job Store backed by a Postgres pool.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_jobs(rows: Vec<JobRow>) -> Result<Vec<Job>, StoreError> {
    rows.into_iter()
        .map(|row| Job::try_from(row).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Job::try_from).transpose().map_err(StoreError::from)
    }

    async fn create(&self, input: &NewJob) -> Result<Job, StoreError> {
        let query = format!(
            "INSERT INTO jobs (id, owner_id, status_id, topic, source_refs) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(uuid::Uuid::now_v7())
            .bind(input.owner_id)
            .bind(JobStatus::Processing.id())
            .bind(&input.topic)
            .bind(&input.source_refs)
            .fetch_one(&self.pool)
            .await?;
        Ok(Job::try_from(row)?)
    }

    async fn update_if_version(&self, job: &Job, expected_version: i64) -> Result<Job, StoreError> {
        let query = format!(
            "UPDATE jobs SET \
                 status_id = $3, product_type_id = $4, content_ref = $5, \
                 product_refs = $6, word_count = $7, failure_reason = $8, \
                 output_config = $9, entity_status_id = $10, \
                 version = version + 1, \
                 last_modified_at = GREATEST(NOW(), last_modified_at) \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(job.id)
            .bind(expected_version)
            .bind(job.status.id())
            .bind(job.product_type.map(|t| t.id()))
            .bind(&job.content_ref)
            .bind(&job.product_refs)
            .bind(job.word_count)
            .bind(&job.failure_reason)
            .bind(job.output_config.as_ref().map(Json))
            .bind(job.entity_status.id())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Job::try_from(row)?),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1)")
                        .bind(job.id)
                        .fetch_one(&self.pool)
                        .await?;
                if exists {
                    Err(StoreError::Conflict(job.id))
                } else {
                    Err(StoreError::NotFound(job.id))
                }
            }
        }
    }

    async fn delete(&self, id: JobId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_completed(
        &self,
        owner_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE owner_id = $1 AND status_id = $2 AND entity_status_id = $3 \
             ORDER BY created_at DESC \
             LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(owner_id)
            .bind(JobStatus::Completed.id())
            .bind(EntityStatus::Active.id())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        into_jobs(rows)
    }

    async fn list_stalled(&self, cutoff: Timestamp, limit: i64) -> Result<Vec<Job>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status_id = ANY($1) AND last_modified_at < $2 \
             ORDER BY last_modified_at ASC \
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(&WORKER_BOUND_STATUSES[..])
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        into_jobs(rows)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}
