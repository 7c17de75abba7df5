//! HTTP client for the hosted OCR service.
//!
//! This module owns every wire type and remote operation the library
//! consumes; nothing here reimplements OCR. The service contract:
//!
//! * `POST /files` — multipart upload of an artifact, returns a file id
//! * `GET /files/{id}/url` — short-lived signed URL for an uploaded document
//! * `POST /ocr` — synchronous single-document extraction
//! * `POST /batch/jobs` / `GET /batch/jobs/{id}` — batch creation and status
//! * `GET /files/{id}/content` — raw bytes of a stored artifact
//! * `POST /chat/completions` — vision chat, used for structured extraction
//!
//! [`BatchApi`] abstracts the batch-relevant subset behind a trait so the
//! orchestration and polling code can be exercised against scripted fakes.

use crate::config::OcrConfig;
use crate::error::OcrError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ── Wire types ───────────────────────────────────────────────────────────

/// Remote lifecycle state of a batch job.
///
/// `Queued` and `Running` are non-terminal; everything else ends polling.
/// States this client does not model (service-side cancellation, expiry)
/// deserialize as [`JobState::Other`] and are treated like `failed`:
/// terminal and non-successful. An unknown status must never keep the
/// poller spinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    #[serde(alias = "SUCCESS")]
    Completed,
    Failed,
    #[serde(other)]
    Other,
}

impl JobState {
    /// True once no further status transition can occur.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Queued | JobState::Running)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Queued => "QUEUED",
            JobState::Running => "RUNNING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// Snapshot of a batch job as reported by the service.
///
/// Every status fetch returns a fresh independent snapshot; the client never
/// mutates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    /// Job handle — the only token needed to poll or fetch results.
    pub id: String,
    pub status: JobState,
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub succeeded_requests: u64,
    #[serde(default)]
    pub failed_requests: u64,
    /// Reference to the result artifact, present once the job completed.
    #[serde(default)]
    pub output_file: Option<String>,
}

/// Handle for an uploaded artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct FileHandle {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignedUrl {
    url: String,
}

/// Document reference embedded in OCR requests.
///
/// Either an inline data URL (images) or a remote/signed URL (uploaded PDFs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentSource {
    ImageUrl { image_url: String },
    DocumentUrl { document_url: String },
}

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: &'a DocumentSource,
    include_image_base64: bool,
}

/// One page of a synchronous OCR response.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrPage {
    #[serde(default)]
    pub index: usize,
    pub markdown: String,
}

/// Synchronous OCR response: one markdown blob per page.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrResponse {
    #[serde(default)]
    pub pages: Vec<OcrPage>,
}

#[derive(Debug, Serialize)]
struct BatchJobRequest<'a> {
    input_files: &'a [String],
    model: &'a str,
    endpoint: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: &'a BTreeMap<String, String>,
}

// ── Chat wire types (structured extraction) ──────────────────────────────

/// One chunk of multimodal chat content.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentChunk {
    Text { text: String },
    ImageUrl { image_url: String },
}

/// A chat message made of multimodal chunks.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Vec<ContentChunk>,
}

impl ChatMessage {
    pub fn user(content: Vec<ContentChunk>) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

// ── Trait seam for batch operations ──────────────────────────────────────

/// The remote operations the batch flow depends on.
///
/// [`ApiClient`] is the production implementation; tests drive the
/// orchestration with scripted fakes instead of a live endpoint.
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// Upload an artifact, returning its file handle.
    async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        purpose: &str,
    ) -> Result<FileHandle, OcrError>;

    /// Create a batch job over previously uploaded input files.
    async fn create_batch_job(
        &self,
        input_files: &[String],
        model: &str,
        endpoint: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<BatchJob, OcrError>;

    /// Fetch a fresh status snapshot for a job.
    async fn get_batch_job(&self, job_id: &str) -> Result<BatchJob, OcrError>;

    /// Download the raw bytes of a stored artifact.
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, OcrError>;
}

// ── Client ───────────────────────────────────────────────────────────────

/// HTTP client carrying the credential and connection pool.
///
/// Cheap to share by reference; constructed once from an [`OcrConfig`] at
/// process entry.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from the config's credential, base URL, and timeout.
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| OcrError::InvalidConfig(format!("API key is not header-safe: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| OcrError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Read the response body as context for a non-2xx status.
    async fn failure_detail(response: reqwest::Response) -> (u16, String) {
        let status = response.status().as_u16();
        let detail = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        (status, detail)
    }

    /// Fetch a short-lived signed URL for an uploaded document.
    pub async fn get_signed_url(&self, file_id: &str) -> Result<String, OcrError> {
        let operation = "get_signed_url";
        let response = self
            .http
            .get(self.url(&format!("/files/{file_id}/url")))
            .query(&[("expiry", "24")])
            .send()
            .await
            .map_err(|source| OcrError::Transport { operation, source })?;

        if !response.status().is_success() {
            let (status, detail) = Self::failure_detail(response).await;
            return Err(OcrError::ApiError {
                operation,
                status,
                detail,
            });
        }

        let signed: SignedUrl = response
            .json()
            .await
            .map_err(|e| OcrError::UnexpectedResponse {
                operation,
                detail: e.to_string(),
            })?;
        Ok(signed.url)
    }

    /// Run synchronous OCR over a single document.
    pub async fn process(
        &self,
        document: &DocumentSource,
        model: &str,
        include_image_base64: bool,
    ) -> Result<OcrResponse, OcrError> {
        let operation = "ocr_process";
        debug!(model, "OCR process request");

        let request = OcrRequest {
            model,
            document,
            include_image_base64,
        };
        let response = self
            .http
            .post(self.url("/ocr"))
            .json(&request)
            .send()
            .await
            .map_err(|source| OcrError::Transport { operation, source })?;

        if !response.status().is_success() {
            let (status, detail) = Self::failure_detail(response).await;
            return Err(OcrError::ApiError {
                operation,
                status,
                detail,
            });
        }

        response
            .json()
            .await
            .map_err(|e| OcrError::UnexpectedResponse {
                operation,
                detail: e.to_string(),
            })
    }

    /// Vision chat call returning the raw assistant text.
    ///
    /// The request pins `response_format` to a JSON object so the reply can
    /// be parsed as structured data. Temperature 0: extraction should be
    /// deterministic, not creative.
    pub async fn chat_parse(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<String, OcrError> {
        let operation = "chat_parse";
        debug!(model, "structured chat request");

        let request = ChatRequest {
            model,
            messages,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let response = self
            .http
            .post(self.url("/chat/completions"))
            .json(&request)
            .send()
            .await
            .map_err(|source| OcrError::Transport { operation, source })?;

        if !response.status().is_success() {
            let (status, detail) = Self::failure_detail(response).await;
            return Err(OcrError::ApiError {
                operation,
                status,
                detail,
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| OcrError::UnexpectedResponse {
                    operation,
                    detail: e.to_string(),
                })?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(OcrError::UnexpectedResponse {
                operation,
                detail: "response contained no choices".into(),
            })
    }
}

#[async_trait]
impl BatchApi for ApiClient {
    async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        purpose: &str,
    ) -> Result<FileHandle, OcrError> {
        let operation = "upload_file";
        debug!(file_name, purpose, size = bytes.len(), "uploading artifact");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", purpose.to_string())
            .part("file", part);

        let response = self
            .http
            .post(self.url("/files"))
            .multipart(form)
            .send()
            .await
            .map_err(|source| OcrError::Transport { operation, source })?;

        if !response.status().is_success() {
            let (status, detail) = Self::failure_detail(response).await;
            return Err(OcrError::UploadRejected {
                file_name: file_name.to_string(),
                status,
                detail,
            });
        }

        response
            .json()
            .await
            .map_err(|e| OcrError::UnexpectedResponse {
                operation,
                detail: e.to_string(),
            })
    }

    async fn create_batch_job(
        &self,
        input_files: &[String],
        model: &str,
        endpoint: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<BatchJob, OcrError> {
        let operation = "create_batch_job";
        debug!(model, endpoint, inputs = input_files.len(), "creating batch job");

        let request = BatchJobRequest {
            input_files,
            model,
            endpoint,
            metadata,
        };
        let response = self
            .http
            .post(self.url("/batch/jobs"))
            .json(&request)
            .send()
            .await
            .map_err(|source| OcrError::Transport { operation, source })?;

        if !response.status().is_success() {
            let (status, detail) = Self::failure_detail(response).await;
            return Err(OcrError::JobCreationRejected { status, detail });
        }

        response
            .json()
            .await
            .map_err(|e| OcrError::UnexpectedResponse {
                operation,
                detail: e.to_string(),
            })
    }

    async fn get_batch_job(&self, job_id: &str) -> Result<BatchJob, OcrError> {
        let operation = "get_batch_job";
        let response = self
            .http
            .get(self.url(&format!("/batch/jobs/{job_id}")))
            .send()
            .await
            .map_err(|source| OcrError::Transport { operation, source })?;

        if !response.status().is_success() {
            let (status, detail) = Self::failure_detail(response).await;
            return Err(OcrError::ApiError {
                operation,
                status,
                detail,
            });
        }

        response
            .json()
            .await
            .map_err(|e| OcrError::UnexpectedResponse {
                operation,
                detail: e.to_string(),
            })
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, OcrError> {
        let operation = "download_file";
        let response = self
            .http
            .get(self.url(&format!("/files/{file_id}/content")))
            .send()
            .await
            .map_err(|source| OcrError::Transport { operation, source })?;

        if !response.status().is_success() {
            let (status, detail) = Self::failure_detail(response).await;
            return Err(OcrError::DownloadFailed {
                file_id: file_id.to_string(),
                detail: format!("HTTP {status}: {detail}"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| OcrError::Transport { operation, source })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_state_parses_service_spellings() {
        let queued: JobState = serde_json::from_str("\"QUEUED\"").unwrap();
        let running: JobState = serde_json::from_str("\"RUNNING\"").unwrap();
        let completed: JobState = serde_json::from_str("\"COMPLETED\"").unwrap();
        let success: JobState = serde_json::from_str("\"SUCCESS\"").unwrap();
        let failed: JobState = serde_json::from_str("\"FAILED\"").unwrap();

        assert_eq!(queued, JobState::Queued);
        assert_eq!(running, JobState::Running);
        assert_eq!(completed, JobState::Completed);
        assert_eq!(success, JobState::Completed);
        assert_eq!(failed, JobState::Failed);
    }

    #[test]
    fn unmodelled_state_is_terminal() {
        let cancelled: JobState = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(cancelled, JobState::Other);
        assert!(cancelled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn batch_job_deserialises_with_missing_counts() {
        // Fresh jobs may not report counts yet.
        let job: BatchJob =
            serde_json::from_str(r#"{"id":"job-1","status":"QUEUED"}"#).unwrap();
        assert_eq!(job.id, "job-1");
        assert_eq!(job.total_requests, 0);
        assert!(job.output_file.is_none());
    }

    #[test]
    fn document_source_wire_shape() {
        let doc = DocumentSource::ImageUrl {
            image_url: "data:image/png;base64,AAAA".into(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "image_url");
        assert_eq!(json["image_url"], "data:image/png;base64,AAAA");

        let pdf = DocumentSource::DocumentUrl {
            document_url: "https://signed.example/doc.pdf".into(),
        };
        let json = serde_json::to_value(&pdf).unwrap();
        assert_eq!(json["type"], "document_url");
    }

    #[test]
    fn batch_request_skips_empty_metadata() {
        let request = BatchJobRequest {
            input_files: &["file-1".to_string()],
            model: "mistral-ocr-latest",
            endpoint: "/v1/ocr",
            metadata: &BTreeMap::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("metadata").is_none());
        assert_eq!(json["endpoint"], "/v1/ocr");
    }

    #[test]
    fn content_chunk_wire_shape() {
        let chunk = ContentChunk::Text {
            text: "hello".into(),
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["type"], "text");

        let img = ContentChunk::ImageUrl {
            image_url: "data:image/jpeg;base64,BBBB".into(),
        };
        let json = serde_json::to_value(&img).unwrap();
        assert_eq!(json["type"], "image_url");
    }
}
