//! Job submission: upload the descriptor, then create the remote batch job.
//!
//! Two sequential mutating calls. Neither is retried here: re-uploading a
//! rejected descriptor is pointless, and re-issuing a create after an
//! ambiguous failure risks a duplicate remote job. Failures surface to the
//! caller immediately with the remote detail attached.

use crate::api::{BatchApi, BatchJob};
use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::pipeline::descriptor::JobDescriptor;
use tracing::info;

/// Name given to the uploaded descriptor artifact.
pub const DESCRIPTOR_FILE_NAME: &str = "batch_requests.jsonl";

/// Endpoint selector telling the service which operation the job performs.
pub const OCR_ENDPOINT: &str = "/v1/ocr";

/// Artifact purpose for batch inputs.
pub const BATCH_PURPOSE: &str = "batch";

/// Upload a descriptor and create a batch job over it.
///
/// # Errors
/// * [`OcrError::InvalidConfig`] for an empty descriptor — the service would
///   accept it and instantly "complete" a zero-item job, which is never what
///   the caller meant.
/// * [`OcrError::UploadRejected`] / [`OcrError::JobCreationRejected`] as
///   reported by the remote service.
pub async fn submit_job<A: BatchApi + ?Sized>(
    api: &A,
    descriptor: &JobDescriptor,
    config: &OcrConfig,
) -> Result<BatchJob, OcrError> {
    if descriptor.is_empty() {
        return Err(OcrError::InvalidConfig(
            "Batch descriptor contains no requests".into(),
        ));
    }

    let jsonl = descriptor.to_jsonl()?;
    let handle = api
        .upload_file(DESCRIPTOR_FILE_NAME, jsonl, BATCH_PURPOSE)
        .await?;
    info!(file_id = %handle.id, requests = descriptor.len(), "descriptor uploaded");

    let input_files = [handle.id];
    let job = api
        .create_batch_job(&input_files, &config.ocr_model, OCR_ENDPOINT, &config.job_metadata)
        .await?;
    info!(job_id = %job.id, status = %job.status, "batch job created");

    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DocumentSource, FileHandle, JobState};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Scripted fake recording the calls the submitter makes.
    struct RecordingApi {
        uploads: Mutex<Vec<(String, Vec<u8>, String)>>,
        created_with: Mutex<Vec<(Vec<String>, String, String)>>,
        reject_upload: bool,
    }

    impl RecordingApi {
        fn new(reject_upload: bool) -> Self {
            Self {
                uploads: Mutex::new(Vec::new()),
                created_with: Mutex::new(Vec::new()),
                reject_upload,
            }
        }
    }

    #[async_trait]
    impl BatchApi for RecordingApi {
        async fn upload_file(
            &self,
            file_name: &str,
            bytes: Vec<u8>,
            purpose: &str,
        ) -> Result<FileHandle, OcrError> {
            if self.reject_upload {
                return Err(OcrError::UploadRejected {
                    file_name: file_name.to_string(),
                    status: 413,
                    detail: "too large".into(),
                });
            }
            self.uploads
                .lock()
                .unwrap()
                .push((file_name.to_string(), bytes, purpose.to_string()));
            Ok(FileHandle {
                id: "file-42".into(),
                filename: Some(file_name.to_string()),
            })
        }

        async fn create_batch_job(
            &self,
            input_files: &[String],
            model: &str,
            endpoint: &str,
            _metadata: &BTreeMap<String, String>,
        ) -> Result<BatchJob, OcrError> {
            self.created_with.lock().unwrap().push((
                input_files.to_vec(),
                model.to_string(),
                endpoint.to_string(),
            ));
            Ok(BatchJob {
                id: "job-1".into(),
                status: JobState::Queued,
                total_requests: 0,
                succeeded_requests: 0,
                failed_requests: 0,
                output_file: None,
            })
        }

        async fn get_batch_job(&self, _job_id: &str) -> Result<BatchJob, OcrError> {
            unreachable!("submitter never polls")
        }

        async fn download_file(&self, _file_id: &str) -> Result<Vec<u8>, OcrError> {
            unreachable!("submitter never downloads")
        }
    }

    fn descriptor(n: usize) -> JobDescriptor {
        JobDescriptor::build(
            (0..n).map(|i| DocumentSource::ImageUrl {
                image_url: format!("data:image/png;base64,{i}"),
            }),
            false,
        )
    }

    fn config() -> OcrConfig {
        OcrConfig::builder("sk-test")
            .job_metadata_tag("job_type", "test")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn submits_descriptor_then_creates_job() {
        let api = RecordingApi::new(false);
        let job = submit_job(&api, &descriptor(3), &config()).await.unwrap();
        assert_eq!(job.id, "job-1");

        let uploads = api.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let (name, bytes, purpose) = &uploads[0];
        assert_eq!(name, DESCRIPTOR_FILE_NAME);
        assert_eq!(purpose, BATCH_PURPOSE);
        assert_eq!(std::str::from_utf8(bytes).unwrap().lines().count(), 3);

        let created = api.created_with.lock().unwrap();
        assert_eq!(created.len(), 1);
        let (inputs, model, endpoint) = &created[0];
        assert_eq!(inputs, &vec!["file-42".to_string()]);
        assert_eq!(model, "mistral-ocr-latest");
        assert_eq!(endpoint, OCR_ENDPOINT);
    }

    #[tokio::test]
    async fn upload_rejection_stops_the_run_before_job_creation() {
        let api = RecordingApi::new(true);
        let err = submit_job(&api, &descriptor(2), &config()).await.unwrap_err();
        assert!(matches!(err, OcrError::UploadRejected { status: 413, .. }));
        assert!(api.created_with.lock().unwrap().is_empty(), "no job created");
    }

    #[tokio::test]
    async fn empty_descriptor_is_refused_locally() {
        let api = RecordingApi::new(false);
        let err = submit_job(&api, &descriptor(0), &config()).await.unwrap_err();
        assert!(matches!(err, OcrError::InvalidConfig(_)));
        assert!(api.uploads.lock().unwrap().is_empty(), "nothing uploaded");
    }
}
