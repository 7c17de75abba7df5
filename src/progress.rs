//! Progress-callback trait for batch-job tracking events.
//!
//! The poller emits one observation per status fetch. A callback is the
//! least-invasive integration point: callers can forward observations to a
//! terminal progress line, a channel, or a log sink without the library
//! knowing how the host application communicates. All methods have default
//! no-op implementations so callers override only what they care about.

use crate::api::{BatchJob, JobState};
use std::sync::Arc;

/// One progress observation, derived from a fresh job-status snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PollObservation {
    pub state: JobState,
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Fraction of requests that reached a per-item outcome, 0–100.
    pub percent: f64,
}

impl PollObservation {
    /// Derive an observation from a status snapshot.
    pub fn from_job(job: &BatchJob) -> Self {
        Self {
            state: job.status,
            total: job.total_requests,
            succeeded: job.succeeded_requests,
            failed: job.failed_requests,
            percent: percent_complete(job.succeeded_requests, job.failed_requests, job.total_requests),
        }
    }
}

/// Percent of requests with a per-item outcome.
///
/// A job snapshot taken before the service counted its inputs reports
/// `total = 0`; that reads as 0 % rather than dividing by zero.
pub fn percent_complete(succeeded: u64, failed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (succeeded + failed) as f64 / total as f64 * 100.0
}

/// Called by the batch flow as the job advances.
///
/// Implementations must be `Send + Sync`; the flow itself is single-threaded
/// but callbacks are shared across await points.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the job is created, before the first poll.
    fn on_submitted(&self, job_id: &str) {
        let _ = job_id;
    }

    /// Called after every successful status fetch, terminal or not.
    fn on_status(&self, observation: &PollObservation) {
        let _ = observation;
    }

    /// Called when a status fetch failed transiently and will be retried.
    fn on_fetch_retry(&self, attempt: u32, error: &str) {
        let _ = (attempt, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias for a shared callback.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
