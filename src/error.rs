//! Error types for the batchocr library.
//!
//! One variant per failure class in the client's taxonomy. Two rules shape
//! the enum:
//!
//! * Mutating remote operations (artifact upload, job creation) are never
//!   retried — a duplicate submission would create a second remote job — so
//!   [`OcrError::UploadRejected`] and [`OcrError::JobCreationRejected`] are
//!   immediately fatal to the run.
//!
//! * A job that reports `failed` status is **not** a client bug. It surfaces
//!   as [`OcrError::JobFailed`] carrying the exact request counts the remote
//!   service reported, so the operator can diagnose partial progress.

use thiserror::Error;

/// All errors returned by the batchocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Configuration errors ─────────────────────────────────────────────
    /// The required API credential is absent from the environment.
    #[error("{var} not found in environment.\nSet it before starting: export {var}=...")]
    MissingApiKey { var: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ─────────────────────────────────────────────────────
    /// Input file could not be read from disk.
    #[error("Failed to read input '{name}': {source}")]
    InputUnreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Input bytes were empty; there is nothing to encode.
    #[error("Input '{name}' is empty — nothing to encode")]
    EmptyInput { name: String },

    // ── Submission errors (not retried) ──────────────────────────────────
    /// The remote service rejected the artifact upload.
    #[error("Upload of '{file_name}' rejected (HTTP {status}): {detail}")]
    UploadRejected {
        file_name: String,
        status: u16,
        detail: String,
    },

    /// The remote service rejected the batch-job creation request.
    #[error("Batch job creation rejected (HTTP {status}): {detail}\nCheck the model and endpoint selectors.")]
    JobCreationRejected { status: u16, detail: String },

    // ── Polling errors ───────────────────────────────────────────────────
    /// Status fetches kept failing past the transient-retry budget.
    #[error("Polling job '{job_id}' failed after {attempts} consecutive fetch errors: {detail}")]
    PollFailed {
        job_id: String,
        attempts: u32,
        detail: String,
    },

    /// The job itself reported terminal `failed` status.
    #[error("Batch job '{job_id}' failed: {succeeded}/{total} succeeded, {failed} failed")]
    JobFailed {
        job_id: String,
        total: u64,
        succeeded: u64,
        failed: u64,
    },

    // ── Result-fetch errors ──────────────────────────────────────────────
    /// A completed job carried no output-artifact reference.
    ///
    /// The service contract guarantees an output file for completed jobs, so
    /// this is fatal and never retried.
    #[error("Job '{job_id}' completed but reported no output file — service contract violation")]
    MissingOutputFile { job_id: String },

    /// Downloading the result artifact failed.
    #[error("Failed to download result file '{file_id}': {detail}")]
    DownloadFailed { file_id: String, detail: String },

    /// A result line was not valid JSON.
    #[error("Malformed result line {line}: {detail}")]
    MalformedResult { line: usize, detail: String },

    // ── Remote API errors ────────────────────────────────────────────────
    /// Any other non-2xx response from the remote API.
    #[error("API error (HTTP {status}) on {operation}: {detail}")]
    ApiError {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// Transport-level failure (DNS, TLS, connect, timeout).
    #[error("HTTP transport error on {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The API returned a body the client could not decode.
    #[error("Unexpected response shape from {operation}: {detail}")]
    UnexpectedResponse {
        operation: &'static str,
        detail: String,
    },

    // ── Extraction errors ────────────────────────────────────────────────
    /// OCR returned no pages for a document.
    #[error("OCR produced no pages for '{name}'")]
    NoPages { name: String },

    /// The structured-extraction response was not the expected JSON object.
    #[error("Structured extraction returned invalid JSON: {detail}")]
    StructuredParseFailed { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failed_display_carries_counts() {
        let e = OcrError::JobFailed {
            job_id: "job-123".into(),
            total: 3,
            succeeded: 1,
            failed: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains("job-123"));
        assert!(msg.contains("1/3"), "got: {msg}");
        assert!(msg.contains("2 failed"), "got: {msg}");
    }

    #[test]
    fn missing_api_key_names_the_variable() {
        let e = OcrError::MissingApiKey {
            var: "MISTRAL_API_KEY",
        };
        assert!(e.to_string().contains("MISTRAL_API_KEY"));
    }

    #[test]
    fn missing_output_file_display() {
        let e = OcrError::MissingOutputFile {
            job_id: "job-9".into(),
        };
        assert!(e.to_string().contains("job-9"));
        assert!(e.to_string().contains("no output file"));
    }

    #[test]
    fn poll_failed_display() {
        let e = OcrError::PollFailed {
            job_id: "job-7".into(),
            attempts: 3,
            detail: "connection reset".into(),
        };
        assert!(e.to_string().contains("3 consecutive"));
        assert!(e.to_string().contains("connection reset"));
    }
}
