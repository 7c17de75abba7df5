//! Result fetching: download and parse the output artifact of a completed job.
//!
//! The artifact is line-delimited JSON, one record per original request.
//! Output order is **not** guaranteed to match input order — the service
//! dispatches items independently — so correlation uses the `custom_id`
//! inside each line, never line position.
//!
//! Only completed jobs are fetched. A failed job's counts surface to the
//! caller instead; if a failed job still carries an output reference, the
//! explicitly opt-in [`fetch_partial_results`] can retrieve whatever per-item
//! records the service kept.

use crate::api::{BatchApi, BatchJob, JobState};
use crate::error::OcrError;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// One line of the result artifact.
///
/// Carries the correlation identifier plus either a response payload or a
/// per-item error, whichever the service produced.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResultRecord {
    pub custom_id: String,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BatchResultRecord {
    /// Page markdowns nested in the response payload, if the item succeeded.
    ///
    /// The per-item response mirrors the synchronous OCR shape:
    /// `{"body": {"pages": [{"markdown": ...}, ...]}}`.
    pub fn markdown_pages(&self) -> Vec<&str> {
        let Some(response) = &self.response else {
            return Vec::new();
        };
        let pages = response
            .get("body")
            .and_then(|b| b.get("pages"))
            .or_else(|| response.get("pages"));
        pages
            .and_then(Value::as_array)
            .map(|pages| {
                pages
                    .iter()
                    .filter_map(|p| p.get("markdown").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The downloaded result artifact: raw bytes plus parsed records.
///
/// Raw bytes are kept verbatim so the caller can offer the artifact for
/// download exactly as the service produced it.
#[derive(Debug, Clone)]
pub struct ResultArtifact {
    pub bytes: Vec<u8>,
    pub records: Vec<BatchResultRecord>,
}

impl ResultArtifact {
    /// Parse a line-delimited artifact.
    pub fn parse(bytes: Vec<u8>) -> Result<Self, OcrError> {
        let text = std::str::from_utf8(&bytes).map_err(|e| OcrError::MalformedResult {
            line: 0,
            detail: format!("artifact is not UTF-8: {e}"),
        })?;
        let records = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .enumerate()
            .map(|(line, raw)| {
                serde_json::from_str(raw).map_err(|e| OcrError::MalformedResult {
                    line,
                    detail: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { bytes, records })
    }

    /// Look up a record by its correlation identifier.
    pub fn by_custom_id(&self, custom_id: &str) -> Option<&BatchResultRecord> {
        self.records.iter().find(|r| r.custom_id == custom_id)
    }
}

/// Reference to the output artifact of a completed job.
///
/// # Errors
/// * [`OcrError::JobFailed`] when the job is terminal but not completed —
///   results are not fetched for failed jobs.
/// * [`OcrError::MissingOutputFile`] when a completed job carries no output
///   reference: the service contract promises one, so this is fatal and not
///   retried.
pub fn output_file_ref(job: &BatchJob) -> Result<&str, OcrError> {
    if job.status != JobState::Completed {
        return Err(OcrError::JobFailed {
            job_id: job.id.clone(),
            total: job.total_requests,
            succeeded: job.succeeded_requests,
            failed: job.failed_requests,
        });
    }
    job.output_file
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| OcrError::MissingOutputFile {
            job_id: job.id.clone(),
        })
}

/// Download and parse the result artifact of a completed job.
pub async fn fetch_results<A: BatchApi + ?Sized>(
    api: &A,
    job: &BatchJob,
) -> Result<ResultArtifact, OcrError> {
    let file_id = output_file_ref(job)?;
    info!(job_id = %job.id, file_id, "downloading result artifact");
    let bytes = api.download_file(file_id).await?;
    let artifact = ResultArtifact::parse(bytes)?;
    info!(job_id = %job.id, records = artifact.records.len(), "results parsed");
    Ok(artifact)
}

/// Best-effort retrieval of per-item records for a job that did not complete.
///
/// Opt-in only: the default flow reports a failed job's counts and stops.
/// Returns `Ok(None)` when the service kept no output artifact for the job.
pub async fn fetch_partial_results<A: BatchApi + ?Sized>(
    api: &A,
    job: &BatchJob,
) -> Result<Option<ResultArtifact>, OcrError> {
    let Some(file_id) = job.output_file.as_deref().filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    warn!(
        job_id = %job.id,
        status = %job.status,
        "fetching partial results for a non-completed job"
    );
    let bytes = api.download_file(file_id).await?;
    Ok(Some(ResultArtifact::parse(bytes)?))
}
