//! Structured extraction: OCR an image, then distill the text into a typed
//! JSON record via the vision chat endpoint.
//!
//! Two remote calls. The OCR pass produces faithful markdown; the chat pass
//! sees both the original image and that markdown, which grounds the
//! structured answer in text the OCR model already read rather than asking
//! the chat model to re-transcribe pixels.

use crate::api::{ApiClient, ChatMessage, ContentChunk, DocumentSource};
use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::languages;
use crate::pipeline::encode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Structured record distilled from one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredDocument {
    /// Display name of the source file (set by the caller, not the model).
    pub file_name: String,
    /// Topics the model identified in the document.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Languages present, normalized to English names and validated against
    /// the ISO 639-1 table; unknown values are dropped.
    #[serde(default)]
    pub languages: Vec<String>,
    /// The OCR contents arranged as a JSON object.
    #[serde(default)]
    pub ocr_contents: Value,
}

fn parse_instruction(ocr_markdown: &str) -> String {
    format!(
        "This is the image's OCR in markdown:\n\
         <BEGIN_IMAGE_OCR>\n{ocr_markdown}\n<END_IMAGE_OCR>\n\
         Convert this into a structured JSON response with the fields \
         \"file_name\" (string), \"topics\" (array of strings), \
         \"languages\" (array of language names), and \"ocr_contents\" \
         (the OCR contents arranged as a sensible JSON object)."
    )
}

/// OCR an image and extract a [`StructuredDocument`] from it.
///
/// # Errors
/// Encoding and API errors as usual, plus
/// [`OcrError::StructuredParseFailed`] when the chat reply is not the
/// expected JSON object.
pub async fn extract_structured(
    api: &ApiClient,
    name: &str,
    image_bytes: &[u8],
    config: &OcrConfig,
) -> Result<StructuredDocument, OcrError> {
    let data_url = encode::data_url(name, image_bytes, encode::guess_mime(name))?;

    // Pass 1: plain OCR.
    let document = DocumentSource::ImageUrl {
        image_url: data_url.clone(),
    };
    let ocr = api
        .process(&document, &config.ocr_model, false)
        .await?;
    let markdown = ocr
        .pages
        .first()
        .map(|p| p.markdown.as_str())
        .unwrap_or_default();
    debug!(name, ocr_len = markdown.len(), "OCR pass complete");

    // Pass 2: structured distillation over image + markdown.
    let messages = [ChatMessage::user(vec![
        ContentChunk::ImageUrl {
            image_url: data_url,
        },
        ContentChunk::Text {
            text: parse_instruction(markdown),
        },
    ])];
    let reply = api.chat_parse(&messages, &config.parse_model).await?;

    let mut parsed: StructuredDocument =
        serde_json::from_str(&reply).map_err(|e| OcrError::StructuredParseFailed {
            detail: format!("{e}; reply began: {:.120}", reply),
        })?;

    // The model does not know the upload's real name.
    parsed.file_name = name.to_string();
    parsed.languages = validate_languages(parsed.languages);
    Ok(parsed)
}

/// Keep only languages the static table knows, normalized to English names.
fn validate_languages(raw: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in raw {
        match languages::normalize(&value) {
            Some(name) => {
                if !seen.iter().any(|s: &String| s == name) {
                    seen.push(name.to_string());
                }
            }
            None => warn!(%value, "dropping unrecognised language value"),
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_languages_normalizes_and_drops_unknown() {
        let out = validate_languages(vec![
            "fr".into(),
            "French".into(),
            "Japanese".into(),
            "Klingon".into(),
        ]);
        assert_eq!(out, vec!["French".to_string(), "Japanese".to_string()]);
    }

    #[test]
    fn structured_document_round_trips() {
        let doc = StructuredDocument {
            file_name: "receipt.png".into(),
            topics: vec!["groceries".into()],
            languages: vec!["English".into()],
            ocr_contents: json!({"total": "12.50"}),
        };
        let text = serde_json::to_string(&doc).unwrap();
        let back: StructuredDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(back.file_name, "receipt.png");
        assert_eq!(back.ocr_contents["total"], "12.50");
    }

    #[test]
    fn structured_document_tolerates_missing_fields() {
        let back: StructuredDocument =
            serde_json::from_str(r#"{"file_name":"x.png"}"#).unwrap();
        assert!(back.topics.is_empty());
        assert!(back.languages.is_empty());
        assert!(back.ocr_contents.is_null());
    }

    #[test]
    fn instruction_embeds_the_ocr_markdown() {
        let text = parse_instruction("# Receipt\nTotal 12.50");
        assert!(text.contains("<BEGIN_IMAGE_OCR>"));
        assert!(text.contains("Total 12.50"));
        assert!(text.contains("<END_IMAGE_OCR>"));
    }
}
