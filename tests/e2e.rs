//! End-to-end integration tests for batchocr.
//!
//! These tests call the live hosted API and therefore cost money and need a
//! credential. They are gated behind the `E2E_ENABLED` environment variable
//! so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 MISTRAL_API_KEY=... cargo test --test e2e -- --nocapture
//!
//! Inputs are not committed (they are real scans). Create a `test_cases/`
//! directory next to `Cargo.toml` holding any documents with readable text:
//!   test_cases/receipt.png   — image input
//!   test_cases/letter.jpg    — second image for the batch test
//!   test_cases/sample.pdf    — PDF input
//! Tests whose input file is absent skip themselves.

use batchocr::{
    extract_path, run_batch, ApiClient, BatchItem, BatchOutcome, NoopProgressCallback, OcrConfig,
    PollOptions,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Directory of local, uncommitted fixtures (see the module doc for the
/// expected file names).
fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test unless E2E_ENABLED is set *and* the input file exists.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn live_config() -> OcrConfig {
    OcrConfig::from_env().expect("MISTRAL_API_KEY must be set for e2e tests")
}

// ── Config tests (no network) ────────────────────────────────────────────────

#[test]
fn config_from_env_fails_without_credential() {
    // Only meaningful when the variable is absent; skip otherwise rather
    // than mutating the process environment under a parallel test runner.
    if std::env::var(batchocr::API_KEY_VAR).is_ok() {
        println!("SKIP — credential present in environment");
        return;
    }
    assert!(OcrConfig::from_env().is_err());
}

// ── Live extraction tests ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_extract_single_image() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("receipt.png"));
    let config = live_config();
    let api = ApiClient::new(&config).unwrap();

    let output = extract_path(&api, &path, &config)
        .await
        .expect("extraction should succeed");

    assert!(!output.markdown.trim().is_empty(), "markdown is empty");
    assert!(!output.pages.is_empty());
    println!("extracted {} page(s), {} bytes", output.pages.len(), output.markdown.len());
}

#[tokio::test]
async fn e2e_extract_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let config = live_config();
    let api = ApiClient::new(&config).unwrap();

    let output = extract_path(&api, &path, &config)
        .await
        .expect("PDF extraction should succeed");
    assert!(!output.markdown.trim().is_empty());
}

// ── Live batch test ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_batch_two_images() {
    let first = e2e_skip_unless_ready!(test_cases_dir().join("receipt.png"));
    let second = e2e_skip_unless_ready!(test_cases_dir().join("letter.jpg"));

    let config = live_config();
    let api = ApiClient::new(&config).unwrap();

    let items = vec![
        BatchItem::from_path(&first).await.unwrap(),
        BatchItem::from_path(&second).await.unwrap(),
    ];

    let opts = PollOptions::from_config(&config);
    let outcome = run_batch(&api, &items, &config, &opts, &NoopProgressCallback)
        .await
        .expect("batch run should succeed");

    match outcome {
        BatchOutcome::Completed { job, results } => {
            assert_eq!(job.total_requests, 2);
            assert_eq!(results.records.len(), 2);
            // Correlation identifiers cover exactly the submitted items.
            assert!(results.by_custom_id("0").is_some());
            assert!(results.by_custom_id("1").is_some());
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}
