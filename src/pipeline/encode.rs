//! Input encoding: raw bytes → base64 data URL.
//!
//! The OCR API accepts images inline as `data:<mime>;base64,<payload>` URLs
//! embedded in the JSON request body. Encoding is deterministic and lossless:
//! decoding the payload yields the original bytes exactly.

use crate::error::OcrError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode raw file bytes as a data URL safe for a JSON request body.
///
/// # Errors
/// [`OcrError::EmptyInput`] when `bytes` is empty — an empty document can
/// never OCR to anything, and catching it here beats a confusing remote 400.
pub fn data_url(name: &str, bytes: &[u8], mime: &str) -> Result<String, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::EmptyInput {
            name: name.to_string(),
        });
    }
    let b64 = STANDARD.encode(bytes);
    debug!(name, mime, encoded_len = b64.len(), "encoded input");
    Ok(format!("data:{mime};base64,{b64}"))
}

/// Guess a MIME type from a file name's extension.
///
/// Falls back to `image/jpeg` for unrecognised extensions; the service
/// sniffs the payload anyway, so a wrong label is harmless.
pub fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "image/jpeg",
    }
}

/// True when the file name refers to a PDF rather than an image.
pub fn is_pdf(file_name: &str) -> bool {
    guess_mime(file_name) == "application/pdf"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_restores_original_bytes() {
        let original: Vec<u8> = (0u8..=255).collect();
        let url = data_url("blob.png", &original, "image/png").unwrap();

        let payload = url
            .strip_prefix("data:image/png;base64,")
            .expect("data URL prefix");
        let decoded = STANDARD.decode(payload).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn single_byte_round_trip() {
        let url = data_url("b.jpg", &[0x7f], "image/jpeg").unwrap();
        let payload = url.strip_prefix("data:image/jpeg;base64,").unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), vec![0x7f]);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = data_url("empty.png", &[], "image/png").unwrap_err();
        assert!(matches!(err, OcrError::EmptyInput { ref name } if name == "empty.png"));
    }

    #[test]
    fn mime_guessing() {
        assert_eq!(guess_mime("scan.png"), "image/png");
        assert_eq!(guess_mime("photo.JPG"), "image/jpeg");
        assert_eq!(guess_mime("doc.pdf"), "application/pdf");
        assert_eq!(guess_mime("animation.webp"), "image/webp");
        assert_eq!(guess_mime("noextension"), "image/jpeg");
    }

    #[test]
    fn pdf_detection() {
        assert!(is_pdf("report.pdf"));
        assert!(is_pdf("REPORT.PDF"));
        assert!(!is_pdf("scan.jpeg"));
    }
}
