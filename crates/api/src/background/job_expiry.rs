//! Periodic expiry of stalled jobs.
//!
//! Jobs waiting on a worker (`Processing`, `CreatingProduct`) whose
//! `last_modified_at` is older than the configured threshold move to
//! `Expired` through the same mutation path webhooks use, so a sweep racing
//! a webhook resolves by version check. Worker heartbeats refresh
//! `last_modified_at`. `ContentGenerated` jobs wait on their owner and are
//! never swept.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use lessoncast_core::channels::Target;
use lessoncast_core::job_events::Notification;
use lessoncast_core::types::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Jobs examined per sweep.
const SWEEP_BATCH: i64 = 100;

/// Run the expiry loop until `cancel` is triggered.
pub async fn run(state: AppState, cancel: CancellationToken) {
    let expiry_secs = state.config.pipeline.job_expiry_secs;
    let interval_secs = state.config.pipeline.job_sweep_interval_secs.max(1);

    tracing::info!(expiry_secs, interval_secs, "Job expiry sweep started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job expiry sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let expired = sweep_once(&state, expiry_secs).await;
                if expired > 0 {
                    tracing::info!(expired, "Job expiry: expired stalled jobs");
                } else {
                    tracing::debug!("Job expiry: nothing stalled");
                }
            }
        }
    }
}

/// `now - expiry_secs`, or `None` when the threshold does not fit a
/// timestamp.
fn stall_cutoff(now: Timestamp, expiry_secs: u64) -> Option<Timestamp> {
    let secs = i64::try_from(expiry_secs).ok()?;
    now.checked_sub_signed(TimeDelta::try_seconds(secs)?)
}

/// Expire every job stalled for longer than `expiry_secs`. Returns how many
/// jobs were expired.
pub async fn sweep_once(state: &AppState, expiry_secs: u64) -> usize {
    let Some(cutoff) = stall_cutoff(Utc::now(), expiry_secs) else {
        tracing::error!(expiry_secs, "Job expiry: threshold out of range, skipping sweep");
        return 0;
    };

    let stalled = match state.store.list_stalled(cutoff, SWEEP_BATCH).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "Job expiry: listing stalled jobs failed");
            return 0;
        }
    };

    let mut expired = 0;
    for candidate in stalled {
        let result = lessoncast_db::apply_mutation(
            state.store.as_ref(),
            candidate.id,
            state.conflict_retries(),
            |job| job.expire_if_stalled(cutoff),
        )
        .await;

        match result {
            Ok(mutated) if mutated.changed() => {
                expired += 1;
                tracing::info!(
                    job_id = %mutated.job.id,
                    from = %mutated.previous.status,
                    "Job expired",
                );
                state
                    .notifications
                    .notify(
                        &Target::User(mutated.job.owner_id),
                        &Notification::JobUpdated(mutated.job.status_event()),
                    )
                    .await;
            }
            Ok(_) => {
                tracing::debug!(job_id = %candidate.id, "Job moved before it could expire");
            }
            Err(e) => {
                tracing::error!(job_id = %candidate.id, error = %e, "Job expiry failed");
            }
        }
    }
    expired
}
