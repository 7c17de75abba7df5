//! End-to-end batch flow: encode → descriptor → submit → poll → fetch.
//!
//! Single logical flow, one in-flight job per run. Every entity created here
//! (encoded items, descriptor, job handle, artifact) is owned by this flow
//! alone; nothing outlives the run except the remote service's own storage
//! of the job and its output.

use crate::api::{BatchApi, BatchJob, DocumentSource};
use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::pipeline::descriptor::JobDescriptor;
use crate::pipeline::poll::{poll_until_terminal, PollOptions, PollOutcome};
use crate::pipeline::results::{fetch_results, ResultArtifact};
use crate::pipeline::{encode, submit};
use crate::progress::BatchProgressCallback;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Concurrent file reads when loading a batch from disk.
const READ_CONCURRENCY: usize = 8;

/// One input to a batch run: raw bytes plus a display name.
///
/// Ephemeral — consumed by the encoder during a single submission.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl BatchItem {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an item from disk, named after the file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, OcrError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| OcrError::InputUnreadable {
                name: name.clone(),
                source,
            })?;
        Ok(Self { name, bytes })
    }

    /// Read many items from disk, a few files in flight at a time.
    ///
    /// Output order matches `paths` — item positions become the batch's
    /// `custom_id`s, so ordering here is load-bearing. The first unreadable
    /// file aborts the whole read.
    pub async fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Self>, OcrError> {
        stream::iter(paths)
            .map(Self::from_path)
            .buffered(READ_CONCURRENCY)
            .try_collect()
            .await
    }
}

/// How a batch run ended.
///
/// A job that reports `failed` is not an outcome but an error
/// ([`OcrError::JobFailed`]) carrying the final counts. `TimedOut` and
/// `Cancelled` leave the remote job running; its id stays valid for later
/// `status`/`fetch` calls.
#[derive(Debug)]
pub enum BatchOutcome {
    /// The job completed and its result artifact was retrieved.
    Completed {
        job: BatchJob,
        results: ResultArtifact,
    },
    /// The polling deadline elapsed first.
    TimedOut {
        job_id: String,
        elapsed: Duration,
        last: Option<BatchJob>,
    },
    /// Cancellation fired during polling.
    Cancelled {
        job_id: String,
        last: Option<BatchJob>,
    },
}

/// Run the full batch flow over the given items.
///
/// Encodes every item as a data URL, builds the JSONL descriptor with
/// positional `custom_id`s, uploads it, creates the job, polls until a
/// terminal state (or deadline/cancellation via `opts`), and downloads the
/// result artifact on completion.
///
/// # Errors
/// Any submission failure, [`OcrError::JobFailed`] with the reported counts
/// when the job itself fails, [`OcrError::PollFailed`] when status fetches
/// keep erroring, and the fetch errors of [`fetch_results`].
pub async fn run_batch<A: BatchApi + ?Sized>(
    api: &A,
    items: &[BatchItem],
    config: &OcrConfig,
    opts: &PollOptions,
    callback: &dyn BatchProgressCallback,
) -> Result<BatchOutcome, OcrError> {
    info!(items = items.len(), "starting batch run");

    let documents = items
        .iter()
        .map(|item| {
            let mime = encode::guess_mime(&item.name);
            let url = encode::data_url(&item.name, &item.bytes, mime)?;
            Ok(DocumentSource::ImageUrl { image_url: url })
        })
        .collect::<Result<Vec<_>, OcrError>>()?;

    let descriptor = JobDescriptor::build(documents, config.include_image_base64);
    let job = submit::submit_job(api, &descriptor, config).await?;
    let job_id = job.id.clone();
    callback.on_submitted(&job_id);

    match poll_until_terminal(api, &job_id, opts, callback).await? {
        PollOutcome::Completed(job) => {
            let results = fetch_results(api, &job).await?;
            Ok(BatchOutcome::Completed { job, results })
        }
        PollOutcome::Failed(job) => Err(OcrError::JobFailed {
            job_id: job.id,
            total: job.total_requests,
            succeeded: job.succeeded_requests,
            failed: job.failed_requests,
        }),
        PollOutcome::TimedOut { elapsed, last } => Ok(BatchOutcome::TimedOut {
            job_id,
            elapsed,
            last,
        }),
        PollOutcome::Cancelled { last } => Ok(BatchOutcome::Cancelled { job_id, last }),
    }
}
