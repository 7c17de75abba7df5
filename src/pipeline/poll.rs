//! Job polling: fixed-interval status checks until a terminal state.
//!
//! State machine over the remote job status:
//!
//! ```text
//! queued ──▶ running ──▶ completed
//!    │          │
//!    └──────────┴──────▶ failed
//! ```
//!
//! `queued` and `running` loop back into polling; `completed` and `failed`
//! end it. The loop is bounded and
//! cancellable: an optional deadline and an optional
//! [`CancellationToken`] each turn the wait into a tagged outcome instead of
//! an unbounded block. Neither stops the remote job — the service keeps
//! processing, and the job id remains valid for later inspection.
//!
//! Status reads are idempotent, so transient fetch errors are retried up to
//! a bounded count; a job that *reports* `failed` is a terminal outcome, not
//! a fetch error, and is never retried.

use crate::api::{BatchJob, BatchApi, JobState};
use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::progress::{BatchProgressCallback, PollObservation};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Source of job-status snapshots.
///
/// Split from [`BatchApi`] so the polling loop can be tested against
/// scripted status sequences without touching the other remote operations.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn job_status(&self, job_id: &str) -> Result<BatchJob, OcrError>;
}

#[async_trait]
impl<T: BatchApi + ?Sized> JobStatusSource for T {
    async fn job_status(&self, job_id: &str) -> Result<BatchJob, OcrError> {
        self.get_batch_job(job_id).await
    }
}

/// Knobs for one polling run.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Time between status fetches.
    pub interval: Duration,
    /// Total wait budget; `None` waits as long as the job takes.
    pub deadline: Option<Duration>,
    /// Cooperative cancellation; observed between fetches.
    pub cancel: Option<CancellationToken>,
    /// Consecutive transient fetch failures tolerated before giving up.
    pub max_fetch_retries: u32,
}

impl PollOptions {
    /// Derive options from the shared config, with no cancellation hook.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            interval: config.poll_interval,
            deadline: config.poll_deadline,
            cancel: None,
            max_fetch_retries: config.max_poll_retries,
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// How a polling run ended.
///
/// Terminal job states carry the final snapshot. `TimedOut` and `Cancelled`
/// carry the last snapshot seen (if any fetch succeeded) so callers can
/// report partial progress.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The job reached `completed`.
    Completed(BatchJob),
    /// The job reached `failed` or another terminal, non-successful state.
    Failed(BatchJob),
    /// The deadline elapsed before any terminal state. The remote job is
    /// still running.
    TimedOut {
        elapsed: Duration,
        last: Option<BatchJob>,
    },
    /// The cancellation token fired. The remote job is still running.
    Cancelled { last: Option<BatchJob> },
}

/// Poll a job until it is terminal, the deadline elapses, or cancellation
/// fires.
///
/// Emits one [`PollObservation`] through `callback` per successful fetch,
/// including the terminal one. No further fetch is issued after a terminal
/// status is observed.
///
/// # Errors
/// [`OcrError::PollFailed`] once consecutive transient fetch failures exceed
/// `opts.max_fetch_retries`.
pub async fn poll_until_terminal<S: JobStatusSource + ?Sized>(
    source: &S,
    job_id: &str,
    opts: &PollOptions,
    callback: &dyn BatchProgressCallback,
) -> Result<PollOutcome, OcrError> {
    let started = Instant::now();
    let mut consecutive_errors: u32 = 0;
    let mut last: Option<BatchJob> = None;

    loop {
        if let Some(token) = &opts.cancel {
            if token.is_cancelled() {
                debug!(job_id, "polling cancelled before fetch");
                return Ok(PollOutcome::Cancelled { last });
            }
        }

        match source.job_status(job_id).await {
            Ok(job) => {
                consecutive_errors = 0;
                let observation = PollObservation::from_job(&job);
                debug!(
                    job_id,
                    state = %observation.state,
                    succeeded = observation.succeeded,
                    failed = observation.failed,
                    total = observation.total,
                    "job status"
                );
                callback.on_status(&observation);

                if job.status.is_terminal() {
                    return Ok(if job.status == JobState::Completed {
                        PollOutcome::Completed(job)
                    } else {
                        PollOutcome::Failed(job)
                    });
                }
                last = Some(job);
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!(
                    job_id,
                    attempt = consecutive_errors,
                    max = opts.max_fetch_retries,
                    "status fetch failed: {e}"
                );
                callback.on_fetch_retry(consecutive_errors, &e.to_string());
                if consecutive_errors > opts.max_fetch_retries {
                    return Err(OcrError::PollFailed {
                        job_id: job_id.to_string(),
                        attempts: consecutive_errors,
                        detail: e.to_string(),
                    });
                }
            }
        }

        if let Some(deadline) = opts.deadline {
            if started.elapsed() + opts.interval >= deadline {
                let elapsed = started.elapsed();
                debug!(job_id, ?elapsed, "poll deadline reached");
                return Ok(PollOutcome::TimedOut { elapsed, last });
            }
        }

        let pause = tokio::time::sleep(opts.interval);
        match &opts.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(job_id, "polling cancelled during wait");
                        return Ok(PollOutcome::Cancelled { last });
                    }
                    _ = pause => {}
                }
            }
            None => pause.await,
        }
    }
}
