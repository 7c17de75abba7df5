//! CLI binary for batchocr.
//!
//! A thin shim over the library crate that maps CLI flags to `OcrConfig`
//! and prints results.

use anyhow::{Context, Result};
use batchocr::{
    extract_path, extract_structured, fetch_partial_results, fetch_results, run_batch, ApiClient,
    BatchApi, BatchItem, BatchOutcome, BatchProgressCallback, JobState, OcrConfig, PollObservation,
    PollOptions, ProgressCallback,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a single spinner line updated on every poll
/// observation.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Submitting");
        bar.set_message("uploading descriptor…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_submitted(&self, job_id: &str) {
        self.bar.set_prefix("Polling");
        self.bar
            .println(format!("{} job {}", cyan("◆"), bold(job_id)));
    }

    fn on_status(&self, o: &PollObservation) {
        self.bar.set_message(format!(
            "{}  {}/{} done  ({} failed)  {:.0}%",
            o.state, o.succeeded, o.total, o.failed, o.percent
        ));
    }

    fn on_fetch_retry(&self, attempt: u32, error: &str) {
        self.bar
            .println(format!("  {} status fetch retry {attempt}: {error}", red("!")));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Single image to stdout
  batchocr extract receipt.png

  # PDF to a file
  batchocr extract report.pdf -o report.md

  # Structured JSON extraction from an image
  batchocr extract receipt.png --structured

  # Batch OCR a directory of scans, results as JSONL
  batchocr batch scans/*.png -o results.jsonl

  # Bounded wait with a 10-minute deadline
  batchocr batch scans/*.png --deadline 600 -o results.jsonl

  # Check on a job after cancelling the wait (Ctrl-C leaves the job running)
  batchocr status 7ab2c3…
  batchocr fetch 7ab2c3… -o results.jsonl

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY   API credential (required)

SETUP:
  1. Set the key:   export MISTRAL_API_KEY=...
  2. Extract:       batchocr extract document.pdf -o out.md
"#;

/// Extract text from images and PDFs via a hosted OCR API.
#[derive(Parser, Debug)]
#[command(
    name = "batchocr",
    version,
    about = "Extract text from images and PDFs via a hosted OCR API",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// OCR model identifier.
    #[arg(long, global = true, env = "BATCHOCR_MODEL")]
    model: Option<String>,

    /// Override the API base URL.
    #[arg(long, global = true, env = "BATCHOCR_BASE_URL")]
    base_url: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "BATCHOCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "BATCHOCR_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// OCR a single image or PDF synchronously.
    Extract {
        /// Image (png/jpg/webp) or PDF file.
        input: PathBuf,

        /// Write output to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Produce a structured JSON record instead of markdown (images only).
        #[arg(long)]
        structured: bool,
    },

    /// OCR many images through an asynchronous batch job.
    Batch {
        /// Image files to process.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Write the result JSONL to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds between job-status polls.
        #[arg(long, default_value_t = 2)]
        interval: u64,

        /// Give up waiting after this many seconds (the job keeps running).
        #[arg(long)]
        deadline: Option<u64>,

        /// Ask the service to echo inline image data in results.
        #[arg(long)]
        include_images: bool,

        /// Disable the progress spinner.
        #[arg(long)]
        no_progress: bool,
    },

    /// Show the current status of an existing batch job.
    Status {
        /// Job id returned at submission.
        job_id: String,
    },

    /// Download the results of an existing batch job.
    Fetch {
        /// Job id returned at submission.
        job_id: String,

        /// Write the result JSONL to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Best-effort download even if the job did not complete.
        #[arg(long)]
        partial: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Config & client ──────────────────────────────────────────────────
    let config = build_config(&cli).context("Invalid configuration")?;
    let api = ApiClient::new(&config).context("Failed to build API client")?;

    match cli.command {
        Command::Extract {
            input,
            output,
            structured,
        } => cmd_extract(&api, &config, &input, output.as_deref(), structured, cli.quiet).await,
        Command::Batch {
            inputs,
            output,
            interval,
            deadline,
            include_images,
            no_progress,
        } => {
            // Overrides go back through build() so e.g. a deadline shorter
            // than the interval is rejected instead of silently timing out.
            let mut builder = config
                .into_builder()
                .include_image_base64(include_images)
                .poll_interval(Duration::from_secs(interval));
            if let Some(secs) = deadline {
                builder = builder.poll_deadline(Duration::from_secs(secs));
            }
            let config = builder.build().context("Invalid polling options")?;
            cmd_batch(
                &api,
                &config,
                &inputs,
                output.as_deref(),
                cli.quiet || no_progress,
            )
            .await
        }
        Command::Status { job_id } => cmd_status(&api, &job_id).await,
        Command::Fetch {
            job_id,
            output,
            partial,
        } => cmd_fetch(&api, &job_id, output.as_deref(), partial).await,
    }
}

/// Map global CLI flags to `OcrConfig`, sourcing the credential from the
/// environment. A missing key is startup-fatal.
fn build_config(cli: &Cli) -> Result<OcrConfig> {
    let mut config = OcrConfig::from_env()?;
    if let Some(ref model) = cli.model {
        config.ocr_model = model.clone();
    }
    if let Some(ref base_url) = cli.base_url {
        config.base_url = base_url.clone();
    }
    Ok(config)
}

async fn cmd_extract(
    api: &ApiClient,
    config: &OcrConfig,
    input: &std::path::Path,
    output: Option<&std::path::Path>,
    structured: bool,
    quiet: bool,
) -> Result<()> {
    let text = if structured {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        let bytes = tokio::fs::read(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let doc = extract_structured(api, &name, &bytes, config)
            .await
            .context("Structured extraction failed")?;
        serde_json::to_string_pretty(&doc).context("Failed to serialise result")?
    } else {
        let result = extract_path(api, input, config)
            .await
            .context("Extraction failed")?;
        if !quiet {
            eprintln!(
                "{} {} page(s) extracted",
                green("✔"),
                bold(&result.pages.len().to_string())
            );
        }
        result.markdown
    };

    write_output(text.as_bytes(), output, true)
}

async fn cmd_batch(
    api: &ApiClient,
    config: &OcrConfig,
    inputs: &[PathBuf],
    output: Option<&std::path::Path>,
    quiet: bool,
) -> Result<()> {
    let items = BatchItem::from_paths(inputs)
        .await
        .context("Failed to read batch inputs")?;

    // Ctrl-C cancels the wait, not the remote job.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let opts = PollOptions::from_config(config).with_cancel(cancel);
    let progress: Option<Arc<CliProgressCallback>> = (!quiet).then(CliProgressCallback::new);
    let callback: ProgressCallback = match &progress {
        Some(cb) => cb.clone(),
        None => Arc::new(batchocr::NoopProgressCallback),
    };

    let outcome = run_batch(api, &items, config, &opts, callback.as_ref()).await;
    if let Some(cb) = &progress {
        cb.finish();
    }

    match outcome.context("Batch run failed")? {
        BatchOutcome::Completed { job, results } => {
            if !quiet {
                eprintln!(
                    "{} job {} completed: {}/{} succeeded, {} failed",
                    green("✔"),
                    bold(&job.id),
                    job.succeeded_requests,
                    job.total_requests,
                    job.failed_requests,
                );
            }
            write_output(&results.bytes, output, false)
        }
        BatchOutcome::TimedOut {
            job_id,
            elapsed,
            last,
        } => {
            eprintln!(
                "{} wait deadline reached after {:.0?} — the job is still running",
                cyan("⚠"),
                elapsed
            );
            print_followup(&job_id, last.as_ref());
            Ok(())
        }
        BatchOutcome::Cancelled { job_id, last } => {
            eprintln!("{} wait cancelled — the job is still running", cyan("⚠"));
            print_followup(&job_id, last.as_ref());
            Ok(())
        }
    }
}

fn print_followup(job_id: &str, last: Option<&batchocr::BatchJob>) {
    if let Some(job) = last {
        eprintln!(
            "   last seen: {}  {}/{} done, {} failed",
            job.status, job.succeeded_requests, job.total_requests, job.failed_requests
        );
    }
    eprintln!("   check later:  {}", dim(&format!("batchocr status {job_id}")));
    eprintln!("   fetch later:  {}", dim(&format!("batchocr fetch {job_id}")));
}

async fn cmd_status(api: &ApiClient, job_id: &str) -> Result<()> {
    let job = api
        .get_batch_job(job_id)
        .await
        .context("Failed to fetch job status")?;
    let tick = match job.status {
        JobState::Completed => green("✔"),
        JobState::Failed | JobState::Other => red("✘"),
        _ => cyan("…"),
    };
    println!(
        "{tick} {}  {}  {}/{} succeeded, {} failed",
        bold(&job.id),
        job.status,
        job.succeeded_requests,
        job.total_requests,
        job.failed_requests,
    );
    if let Some(ref file) = job.output_file {
        println!("   output file: {file}");
    }
    Ok(())
}

async fn cmd_fetch(
    api: &ApiClient,
    job_id: &str,
    output: Option<&std::path::Path>,
    partial: bool,
) -> Result<()> {
    let job = api
        .get_batch_job(job_id)
        .await
        .context("Failed to fetch job status")?;

    let artifact = if partial {
        fetch_partial_results(api, &job)
            .await
            .context("Partial fetch failed")?
            .context("The service kept no output artifact for this job")?
    } else {
        fetch_results(api, &job).await.context("Fetch failed")?
    };

    write_output(&artifact.bytes, output, false)
}

/// Write bytes to a file or stdout, ensuring a trailing newline on stdout.
fn write_output(bytes: &[u8], path: Option<&std::path::Path>, ensure_newline: bool) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(bytes).context("Failed to write to stdout")?;
            if ensure_newline && !bytes.ends_with(b"\n") {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}
