//! Batch request builder: encoded items → line-delimited job descriptor.
//!
//! Each input item becomes one JSONL line:
//!
//! ```json
//! {"custom_id":"0","body":{"document":{"type":"image_url","image_url":"data:..."},"include_image_base64":false}}
//! ```
//!
//! The `custom_id` is the item's zero-based position in the input sequence.
//! The service dispatches items independently and returns results in
//! arbitrary order, so this identifier is the only way to correlate an output
//! record back to its input. It must be unique within the job and stable for
//! the job's lifetime; building from `enumerate()` guarantees no index is
//! skipped or duplicated.

use crate::api::DocumentSource;
use crate::error::OcrError;
use serde::{Deserialize, Serialize};

/// One line of a job descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequestRecord {
    /// Correlation identifier, unique within the job.
    pub custom_id: String,
    pub body: RequestBody,
}

/// Request body mirrored from the synchronous OCR call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    pub document: DocumentSource,
    pub include_image_base64: bool,
}

/// An ordered, immutable sequence of batch request records.
///
/// Written once, serialized once, uploaded as a single artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    records: Vec<BatchRequestRecord>,
}

impl JobDescriptor {
    /// Build a descriptor from encoded document references.
    ///
    /// `custom_id`s are assigned positionally: item `i` gets `"i"`.
    pub fn build(documents: impl IntoIterator<Item = DocumentSource>, include_image_base64: bool) -> Self {
        let records = documents
            .into_iter()
            .enumerate()
            .map(|(index, document)| BatchRequestRecord {
                custom_id: index.to_string(),
                body: RequestBody {
                    document,
                    include_image_base64,
                },
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[BatchRequestRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize as line-delimited JSON, one record per line.
    pub fn to_jsonl(&self) -> Result<Vec<u8>, OcrError> {
        let mut out = Vec::new();
        for (line, record) in self.records.iter().enumerate() {
            let json =
                serde_json::to_vec(record).map_err(|e| OcrError::MalformedResult {
                    line,
                    detail: e.to_string(),
                })?;
            out.extend_from_slice(&json);
            out.push(b'\n');
        }
        Ok(out)
    }

    /// Re-parse a serialized descriptor line by line.
    ///
    /// Used to verify round-trip fidelity; the upload path never needs it.
    pub fn parse(jsonl: &[u8]) -> Result<Self, OcrError> {
        let text = std::str::from_utf8(jsonl).map_err(|e| OcrError::MalformedResult {
            line: 0,
            detail: format!("descriptor is not UTF-8: {e}"),
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
        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn image(url: &str) -> DocumentSource {
        DocumentSource::ImageUrl {
            image_url: url.to_string(),
        }
    }

    #[test]
    fn descriptor_has_one_line_per_item_with_dense_ids() {
        let n = 7;
        let docs: Vec<_> = (0..n).map(|i| image(&format!("data:image/png;base64,item{i}"))).collect();
        let descriptor = JobDescriptor::build(docs, false);

        let jsonl = descriptor.to_jsonl().unwrap();
        let lines: Vec<&str> = std::str::from_utf8(&jsonl)
            .unwrap()
            .lines()
            .collect();
        assert_eq!(lines.len(), n);

        // custom_id values form exactly the set {0, …, n-1}.
        let ids: BTreeSet<String> = descriptor
            .records()
            .iter()
            .map(|r| r.custom_id.clone())
            .collect();
        let expected: BTreeSet<String> = (0..n).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
        assert_eq!(ids.len(), descriptor.len(), "no duplicate identifiers");
    }

    #[test]
    fn line_wire_shape_matches_service_contract() {
        let descriptor = JobDescriptor::build([image("data:image/png;base64,AAAA")], true);
        let jsonl = descriptor.to_jsonl().unwrap();
        let value: serde_json::Value =
            serde_json::from_str(std::str::from_utf8(&jsonl).unwrap().lines().next().unwrap())
                .unwrap();

        assert_eq!(value["custom_id"], "0");
        assert_eq!(value["body"]["document"]["type"], "image_url");
        assert_eq!(value["body"]["document"]["image_url"], "data:image/png;base64,AAAA");
        assert_eq!(value["body"]["include_image_base64"], true);
    }

    #[test]
    fn jsonl_round_trip_preserves_ids_and_urls() {
        let docs: Vec<_> = (0..5)
            .map(|i| image(&format!("data:image/jpeg;base64,payload-{i}")))
            .collect();
        let descriptor = JobDescriptor::build(docs, false);

        let jsonl = descriptor.to_jsonl().unwrap();
        let reparsed = JobDescriptor::parse(&jsonl).unwrap();

        assert_eq!(reparsed, descriptor);
        for (a, b) in descriptor.records().iter().zip(reparsed.records()) {
            assert_eq!(a.custom_id, b.custom_id);
            assert_eq!(a.body.document, b.body.document);
        }
    }

    #[test]
    fn empty_descriptor_serialises_to_nothing() {
        let descriptor = JobDescriptor::build(std::iter::empty(), false);
        assert!(descriptor.is_empty());
        assert!(descriptor.to_jsonl().unwrap().is_empty());
    }

    #[test]
    fn parse_skips_blank_lines() {
        let jsonl = b"\n{\"custom_id\":\"0\",\"body\":{\"document\":{\"type\":\"image_url\",\"image_url\":\"u\"},\"include_image_base64\":false}}\n\n";
        let descriptor = JobDescriptor::parse(jsonl).unwrap();
        assert_eq!(descriptor.len(), 1);
        assert_eq!(descriptor.records()[0].custom_id, "0");
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = JobDescriptor::parse(b"not json\n").unwrap_err();
        assert!(matches!(err, OcrError::MalformedResult { line: 0, .. }));
    }
}
