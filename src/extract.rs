//! Single-document extraction: the synchronous, non-batch flow.
//!
//! Images are small enough to travel inline as a base64 data URL. PDFs go
//! through the service's file store instead — upload, obtain a short-lived
//! signed URL, then OCR by reference — because multi-megabyte documents
//! inside a JSON body hit request-size limits and re-encode poorly.

use crate::api::{ApiClient, DocumentSource};
use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::pipeline::encode;
use std::path::Path;
use tracing::info;

/// Artifact purpose for synchronous OCR uploads.
const OCR_PURPOSE: &str = "ocr";

/// Result of a single-document extraction.
#[derive(Debug, Clone)]
pub struct ExtractOutput {
    /// All page markdowns joined with blank lines, ready for display or
    /// download as text.
    pub markdown: String,
    /// Per-page markdown in page order.
    pub pages: Vec<String>,
}

/// OCR a single file from disk.
///
/// Dispatches on the file extension: PDFs take the upload-and-reference
/// path, everything else is treated as an image and sent inline.
pub async fn extract_path(
    api: &ApiClient,
    path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<ExtractOutput, OcrError> {
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
    extract_bytes(api, &name, &bytes, config).await
}

/// OCR a single document already held in memory.
pub async fn extract_bytes(
    api: &ApiClient,
    name: &str,
    bytes: &[u8],
    config: &OcrConfig,
) -> Result<ExtractOutput, OcrError> {
    let document = if encode::is_pdf(name) {
        upload_for_ocr(api, name, bytes).await?
    } else {
        let url = encode::data_url(name, bytes, encode::guess_mime(name))?;
        DocumentSource::ImageUrl { image_url: url }
    };

    let response = api
        .process(&document, &config.ocr_model, config.include_image_base64)
        .await?;
    if response.pages.is_empty() {
        return Err(OcrError::NoPages {
            name: name.to_string(),
        });
    }

    let pages: Vec<String> = response.pages.into_iter().map(|p| p.markdown).collect();
    info!(name, pages = pages.len(), "extraction complete");

    Ok(ExtractOutput {
        markdown: pages.join("\n\n"),
        pages,
    })
}

/// Upload a PDF and turn it into a signed-URL document reference.
async fn upload_for_ocr(
    api: &ApiClient,
    name: &str,
    bytes: &[u8],
) -> Result<DocumentSource, OcrError> {
    use crate::api::BatchApi as _;

    if bytes.is_empty() {
        return Err(OcrError::EmptyInput {
            name: name.to_string(),
        });
    }
    let handle = api.upload_file(name, bytes.to_vec(), OCR_PURPOSE).await?;
    let url = api.get_signed_url(&handle.id).await?;
    info!(name, file_id = %handle.id, "PDF uploaded for OCR");
    Ok(DocumentSource::DocumentUrl { document_url: url })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_joins_pages_with_blank_lines() {
        let pages = vec!["# Page one".to_string(), "Page two body".to_string()];
        let output = ExtractOutput {
            markdown: pages.join("\n\n"),
            pages,
        };
        assert_eq!(output.markdown, "# Page one\n\nPage two body");
    }
}
