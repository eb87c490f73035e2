//! Job status graph and the decisions derived from it.
//!
//! ```text
//! Processing -> ContentGenerated -> CreatingProduct -> Completed
//!      |               |                  |
//!      +---------------+------------------+--> Failed
//!      any non-terminal ----------------------> Expired | Cancelled
//! ```
//!
//! Everything here is pure. The store applies these decisions inside its
//! single load-mutate-persist choke point.

use crate::error::CoreError;
use crate::status::JobStatus;

/// Position of a status along the forward graph. Terminal states share the
/// highest rank.
pub fn rank(status: JobStatus) -> u8 {
    match status {
        JobStatus::Processing => 0,
        JobStatus::ContentGenerated => 1,
        JobStatus::CreatingProduct => 2,
        JobStatus::Completed | JobStatus::Failed | JobStatus::Expired | JobStatus::Cancelled => 3,
    }
}

/// Returns the set of statuses reachable in one step from `from`.
pub fn valid_transitions(from: JobStatus) -> &'static [JobStatus] {
    use JobStatus::*;
    match from {
        Processing => &[ContentGenerated, Failed, Expired, Cancelled],
        ContentGenerated => &[CreatingProduct, Failed, Expired, Cancelled],
        CreatingProduct => &[Completed, Failed, Expired, Cancelled],
        Completed | Failed | Expired | Cancelled => &[],
    }
}

/// Check whether a transition from `from` to `to` is an edge of the graph.
pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a state transition, returning `InvalidState` for non-edges.
pub fn validate_transition(from: JobStatus, to: JobStatus) -> Result<(), CoreError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Invalid transition: {from} -> {to}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Worker-reported updates
// ---------------------------------------------------------------------------

/// Why a worker update was accepted without changing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The job already reached a terminal status.
    AlreadyTerminal,
    /// The update names a status the job has already moved past.
    Stale,
    /// The update repeats the current status and carries nothing to store.
    Heartbeat,
}

impl IgnoreReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyTerminal => "already_terminal",
            Self::Stale => "stale",
            Self::Heartbeat => "heartbeat",
        }
    }
}

/// What to do with a worker-reported status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerDecision {
    /// Move the job to the given status and store the reported artifacts.
    Transition(JobStatus),
    /// Same status re-reported: overwrite artifact fields, last write wins.
    Refresh,
    /// Benign no-op; respond with success.
    Ignore(IgnoreReason),
}

/// Decide how a worker report of `reported` applies to a job in `current`.
///
/// Ordering between deliveries is resolved by [`rank`]: a report below the
/// job's current rank is a stale retry, a report at the same non-terminal
/// rank overwrites artifacts, and a terminal job never changes again.
/// Workers may not report `Expired` or `Cancelled`, and may not skip edges.
pub fn decide_worker_update(
    current: JobStatus,
    reported: JobStatus,
) -> Result<WorkerDecision, CoreError> {
    if matches!(reported, JobStatus::Expired | JobStatus::Cancelled) {
        return Err(CoreError::InvalidState(format!(
            "Workers cannot report status {reported}"
        )));
    }

    if current.is_terminal() {
        return Ok(WorkerDecision::Ignore(IgnoreReason::AlreadyTerminal));
    }

    if reported == JobStatus::Failed {
        return Ok(WorkerDecision::Transition(JobStatus::Failed));
    }

    if reported == current {
        return Ok(match current {
            JobStatus::ContentGenerated => WorkerDecision::Refresh,
            _ => WorkerDecision::Ignore(IgnoreReason::Heartbeat),
        });
    }

    if rank(reported) < rank(current) {
        return Ok(WorkerDecision::Ignore(IgnoreReason::Stale));
    }

    // Only Confirm may move a job into CreatingProduct.
    if reported == JobStatus::CreatingProduct {
        return Err(CoreError::InvalidState(format!(
            "Job is {current}; it must be confirmed before product creation"
        )));
    }

    validate_transition(current, reported)?;
    Ok(WorkerDecision::Transition(reported))
}

// ---------------------------------------------------------------------------
// User- and system-triggered transitions
// ---------------------------------------------------------------------------

/// Confirm is only legal from exactly `ContentGenerated`.
pub fn check_confirm(current: JobStatus) -> Result<(), CoreError> {
    if current == JobStatus::ContentGenerated {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Job is {current}; only jobs in ContentGenerated can be confirmed"
        )))
    }
}

/// Cancel is legal from any non-terminal status.
pub fn check_cancel(current: JobStatus) -> Result<(), CoreError> {
    validate_transition(current, JobStatus::Cancelled).map_err(|_| {
        CoreError::InvalidState(format!(
            "Job is already {current} and cannot be cancelled"
        ))
    })
}

/// Statuses in which the job waits on a worker rather than on its owner.
pub const WORKER_BOUND: [JobStatus; 2] = [JobStatus::Processing, JobStatus::CreatingProduct];

/// Whether a job in `status` is waiting on a worker.
pub fn awaits_worker(status: JobStatus) -> bool {
    WORKER_BOUND.contains(&status)
}

/// The timeout sweep only expires jobs a worker owes progress on. A
/// `ContentGenerated` job waits on its owner's confirmation and never times out.
pub fn check_expire(current: JobStatus) -> Result<(), CoreError> {
    if current == JobStatus::ContentGenerated {
        return Err(CoreError::InvalidState(
            "Job is waiting for confirmation and does not expire".into(),
        ));
    }
    validate_transition(current, JobStatus::Expired)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use JobStatus::*;

    const ALL: [JobStatus; 7] = [
        Processing,
        ContentGenerated,
        CreatingProduct,
        Completed,
        Failed,
        Expired,
        Cancelled,
    ];

    #[test]
    fn forward_edges_are_valid() {
        assert!(can_transition(Processing, ContentGenerated));
        assert!(can_transition(ContentGenerated, CreatingProduct));
        assert!(can_transition(CreatingProduct, Completed));
    }

    #[test]
    fn every_non_terminal_can_fail_expire_or_cancel() {
        for from in [Processing, ContentGenerated, CreatingProduct] {
            assert!(can_transition(from, Failed), "{from} -> Failed");
            assert!(can_transition(from, Expired), "{from} -> Expired");
            assert!(can_transition(from, Cancelled), "{from} -> Cancelled");
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in [Completed, Failed, Expired, Cancelled] {
            for to in ALL {
                assert!(!can_transition(from, to), "{from} -> {to} must be invalid");
            }
        }
    }

    #[test]
    fn rewinds_and_skips_are_invalid() {
        assert_matches!(
            validate_transition(Completed, Processing),
            Err(CoreError::InvalidState(_))
        );
        assert!(!can_transition(ContentGenerated, Processing));
        assert!(!can_transition(Processing, Completed));
        assert!(!can_transition(Processing, CreatingProduct));
    }

    #[test]
    fn content_ready_on_processing_transitions() {
        assert_eq!(
            decide_worker_update(Processing, ContentGenerated).unwrap(),
            WorkerDecision::Transition(ContentGenerated)
        );
    }

    #[test]
    fn duplicate_content_ready_refreshes() {
        assert_eq!(
            decide_worker_update(ContentGenerated, ContentGenerated).unwrap(),
            WorkerDecision::Refresh
        );
    }

    #[test]
    fn stale_content_ready_after_confirm_is_ignored() {
        assert_eq!(
            decide_worker_update(CreatingProduct, ContentGenerated).unwrap(),
            WorkerDecision::Ignore(IgnoreReason::Stale)
        );
    }

    #[test]
    fn any_report_on_terminal_job_is_ignored() {
        for current in [Completed, Failed, Expired, Cancelled] {
            for reported in [Processing, ContentGenerated, Completed, Failed] {
                assert_eq!(
                    decide_worker_update(current, reported).unwrap(),
                    WorkerDecision::Ignore(IgnoreReason::AlreadyTerminal)
                );
            }
        }
    }

    #[test]
    fn progress_ping_is_a_heartbeat() {
        assert_eq!(
            decide_worker_update(Processing, Processing).unwrap(),
            WorkerDecision::Ignore(IgnoreReason::Heartbeat)
        );
        assert_eq!(
            decide_worker_update(CreatingProduct, CreatingProduct).unwrap(),
            WorkerDecision::Ignore(IgnoreReason::Heartbeat)
        );
    }

    #[test]
    fn failure_is_accepted_from_every_non_terminal_state() {
        for current in [Processing, ContentGenerated, CreatingProduct] {
            assert_eq!(
                decide_worker_update(current, Failed).unwrap(),
                WorkerDecision::Transition(Failed)
            );
        }
    }

    #[test]
    fn skipping_edges_is_invalid() {
        assert_matches!(
            decide_worker_update(Processing, Completed),
            Err(CoreError::InvalidState(_))
        );
        assert_matches!(
            decide_worker_update(ContentGenerated, Completed),
            Err(CoreError::InvalidState(_))
        );
        assert_matches!(
            decide_worker_update(ContentGenerated, CreatingProduct),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn workers_cannot_expire_or_cancel() {
        assert_matches!(
            decide_worker_update(Processing, Cancelled),
            Err(CoreError::InvalidState(_))
        );
        assert_matches!(
            decide_worker_update(Completed, Expired),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn confirm_requires_content_generated() {
        assert!(check_confirm(ContentGenerated).is_ok());
        for current in [Processing, CreatingProduct, Completed, Failed] {
            assert_matches!(check_confirm(current), Err(CoreError::InvalidState(_)));
        }
    }

    #[test]
    fn cancel_and_expire_reject_terminal_jobs() {
        assert!(check_cancel(CreatingProduct).is_ok());
        assert!(check_expire(Processing).is_ok());
        assert_matches!(check_cancel(Completed), Err(CoreError::InvalidState(_)));
        assert_matches!(check_expire(Cancelled), Err(CoreError::InvalidState(_)));
    }

    #[test]
    fn jobs_awaiting_confirmation_never_expire() {
        assert!(!awaits_worker(ContentGenerated));
        assert_matches!(check_expire(ContentGenerated), Err(CoreError::InvalidState(_)));
        for status in WORKER_BOUND {
            assert!(check_expire(status).is_ok(), "{status} should expire");
        }
    }

    #[test]
    fn rank_is_monotonic_along_forward_edges() {
        assert!(rank(Processing) < rank(ContentGenerated));
        assert!(rank(ContentGenerated) < rank(CreatingProduct));
        assert!(rank(CreatingProduct) < rank(Completed));
    }
}
