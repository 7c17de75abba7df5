//! Pipeline stages for the asynchronous batch flow.
//!
//! Each submodule implements exactly one transformation step, so every stage
//! is independently testable and the status source can be swapped for a
//! scripted fake in tests.
//!
//! ## Data Flow
//!
//! ```text
//! encode ──▶ descriptor ──▶ submit ──▶ poll ──▶ results
//! (base64)   (JSONL)        (upload +  (status  (download +
//!                            create)    loop)    correlate)
//! ```
//!
//! 1. [`encode`]     — raw file bytes → base64 data URL
//! 2. [`descriptor`] — data URLs → line-delimited job descriptor with
//!    positional `custom_id`s
//! 3. [`submit`]     — upload the descriptor, create the remote job; the only
//!    mutating stage, never retried
//! 4. [`poll`]       — fixed-interval status loop with deadline/cancellation,
//!    bounded transient-error retry
//! 5. [`results`]    — download the output artifact and correlate records by
//!    `custom_id`

pub mod descriptor;
pub mod encode;
pub mod poll;
pub mod results;
pub mod submit;
