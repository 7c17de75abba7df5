//! # batchocr
//!
//! Send images and PDFs to a hosted OCR/vision API and get the extracted
//! text back — synchronously for a single file, or asynchronously in bulk
//! through the service's batch-job API.
//!
//! No OCR happens on this machine. The crate's job is encoding inputs,
//! calling endpoints, and tracking remote jobs to completion with proper
//! progress, deadlines, and cancellation.
//!
//! ## Batch Flow Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Encode      bytes → base64 data URLs
//!  ├─ 2. Descriptor  one JSONL line per item, positional custom_id
//!  ├─ 3. Submit      upload descriptor, create batch job → job handle
//!  ├─ 4. Poll        fixed-interval status loop until terminal
//!  └─ 5. Fetch       download result artifact, correlate by custom_id
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batchocr::{run_batch, ApiClient, BatchItem, NoopProgressCallback, OcrConfig, PollOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from MISTRAL_API_KEY
//!     let config = OcrConfig::from_env()?;
//!     let api = ApiClient::new(&config)?;
//!
//!     let items = vec![
//!         BatchItem::from_path("scan1.png").await?,
//!         BatchItem::from_path("scan2.jpg").await?,
//!     ];
//!     let opts = PollOptions::from_config(&config);
//!     let outcome = run_batch(&api, &items, &config, &opts, &NoopProgressCallback).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `batchocr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! batchocr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod languages;
pub mod pipeline;
pub mod progress;
pub mod structured;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{ApiClient, BatchApi, BatchJob, DocumentSource, FileHandle, JobState, OcrPage, OcrResponse};
pub use batch::{run_batch, BatchItem, BatchOutcome};
pub use config::{OcrConfig, OcrConfigBuilder, API_KEY_VAR};
pub use error::OcrError;
pub use extract::{extract_bytes, extract_path, ExtractOutput};
pub use pipeline::descriptor::{BatchRequestRecord, JobDescriptor};
pub use pipeline::poll::{poll_until_terminal, JobStatusSource, PollOptions, PollOutcome};
pub use pipeline::results::{fetch_partial_results, fetch_results, BatchResultRecord, ResultArtifact};
pub use progress::{BatchProgressCallback, NoopProgressCallback, PollObservation, ProgressCallback};
pub use structured::{extract_structured, StructuredDocument};
