//! Configuration for OCR submission and batch tracking.
//!
//! All behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`]. The config is constructed once at process entry and
//! passed by reference into every component that issues remote calls — there
//! is no process-global client or credential. It holds no unmanaged resource,
//! so there is nothing to tear down; the HTTP connection pool lives inside
//! [`crate::api::ApiClient`] and is dropped with it.
//!
//! # Design choice: builder over constructor
//! Callers set only what they care about and rely on documented defaults for
//! the rest; adding a knob later does not break existing call sites.

use crate::error::OcrError;
use std::collections::BTreeMap;
use std::time::Duration;

/// Environment variable holding the API credential.
pub const API_KEY_VAR: &str = "MISTRAL_API_KEY";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Default OCR model identifier.
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";

/// Default vision model for structured extraction.
pub const DEFAULT_PARSE_MODEL: &str = "pixtral-12b-latest";

/// Configuration for OCR extraction and batch jobs.
///
/// Built via [`OcrConfig::from_env()`] (reads the credential, applies
/// defaults) or [`OcrConfig::builder()`] for full control.
///
/// # Example
/// ```rust
/// use batchocr::OcrConfig;
/// use std::time::Duration;
///
/// let config = OcrConfig::builder("sk-test")
///     .poll_interval(Duration::from_secs(5))
///     .poll_deadline(Duration::from_secs(600))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// API credential sent as a bearer token on every request.
    pub api_key: String,

    /// Base URL of the hosted API. Default: [`DEFAULT_BASE_URL`].
    ///
    /// Overridable so tests and self-hosted gateways can point the client at
    /// a different origin without touching any other knob.
    pub base_url: String,

    /// OCR model identifier. Default: [`DEFAULT_OCR_MODEL`].
    pub ocr_model: String,

    /// Vision model for structured extraction. Default: [`DEFAULT_PARSE_MODEL`].
    pub parse_model: String,

    /// Ask the service to echo inline image data in OCR responses. Default: false.
    ///
    /// Off by default because echoed base64 inflates response and result
    /// artifacts severalfold for no benefit when only text is wanted.
    pub include_image_base64: bool,

    /// Interval between batch-job status fetches. Default: 2 s.
    ///
    /// Status reads are cheap and idempotent; 2 s keeps progress output
    /// responsive without hammering the endpoint. Raise it for very large
    /// batches where completion takes minutes anyway.
    pub poll_interval: Duration,

    /// Upper bound on total polling time. Default: none.
    ///
    /// `None` means no bound at all: the poller waits as long as the job
    /// takes. Setting a deadline is a deliberate choice —
    /// when it elapses the poller returns a timed-out outcome and stops
    /// polling, but the remote job keeps running and can still be inspected
    /// later with its job id.
    pub poll_deadline: Option<Duration>,

    /// Consecutive transient status-fetch failures tolerated before the
    /// poller gives up. Default: 3.
    ///
    /// Status reads are idempotent, so retrying a network blip is safe. A
    /// definitive `failed` job state is not a fetch error and is never
    /// retried.
    pub max_poll_retries: u32,

    /// Per-request HTTP timeout in seconds. Default: 120.
    pub request_timeout_secs: u64,

    /// Metadata tags attached to created batch jobs.
    ///
    /// Purely informational; the service echoes them back on job reads.
    pub job_metadata: BTreeMap<String, String>,
}

impl OcrConfig {
    /// Build a config from the process environment.
    ///
    /// # Errors
    /// [`OcrError::MissingApiKey`] if [`API_KEY_VAR`] is unset or empty.
    /// Treat this as startup-fatal: nothing in the library works without the
    /// credential.
    pub fn from_env() -> Result<Self, OcrError> {
        let key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(OcrError::MissingApiKey { var: API_KEY_VAR })?;
        OcrConfigBuilder::new(key).build()
    }

    /// Create a new builder seeded with the given API key.
    pub fn builder(api_key: impl Into<String>) -> OcrConfigBuilder {
        OcrConfigBuilder::new(api_key.into())
    }

    /// Turn an existing config back into a builder.
    ///
    /// Overrides applied afterwards go through the same `build()` validation
    /// as the original construction, so a caller adjusting one knob cannot
    /// end up with an inconsistent config.
    pub fn into_builder(self) -> OcrConfigBuilder {
        OcrConfigBuilder { config: self }
    }
}

impl std::fmt::Debug for OcrConfig {
    // api_key is redacted; configs get logged.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("ocr_model", &self.ocr_model)
            .field("parse_model", &self.parse_model)
            .field("include_image_base64", &self.include_image_base64)
            .field("poll_interval", &self.poll_interval)
            .field("poll_deadline", &self.poll_deadline)
            .field("max_poll_retries", &self.max_poll_retries)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("job_metadata", &self.job_metadata)
            .finish()
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    fn new(api_key: String) -> Self {
        Self {
            config: OcrConfig {
                api_key,
                base_url: DEFAULT_BASE_URL.to_string(),
                ocr_model: DEFAULT_OCR_MODEL.to_string(),
                parse_model: DEFAULT_PARSE_MODEL.to_string(),
                include_image_base64: false,
                poll_interval: Duration::from_secs(2),
                poll_deadline: None,
                max_poll_retries: 3,
                request_timeout_secs: 120,
                job_metadata: BTreeMap::new(),
            },
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn parse_model(mut self, model: impl Into<String>) -> Self {
        self.config.parse_model = model.into();
        self
    }

    pub fn include_image_base64(mut self, v: bool) -> Self {
        self.config.include_image_base64 = v;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn poll_deadline(mut self, deadline: Duration) -> Self {
        self.config.poll_deadline = Some(deadline);
        self
    }

    pub fn max_poll_retries(mut self, n: u32) -> Self {
        self.config.max_poll_retries = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn job_metadata_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.job_metadata.insert(key.into(), value.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.api_key.is_empty() {
            return Err(OcrError::InvalidConfig("API key must not be empty".into()));
        }
        if c.base_url.is_empty() || !c.base_url.starts_with("http") {
            return Err(OcrError::InvalidConfig(format!(
                "Base URL must be an HTTP(S) origin, got '{}'",
                c.base_url
            )));
        }
        if c.poll_interval.is_zero() {
            return Err(OcrError::InvalidConfig(
                "Poll interval must be greater than zero".into(),
            ));
        }
        if let Some(deadline) = c.poll_deadline {
            if deadline < c.poll_interval {
                return Err(OcrError::InvalidConfig(format!(
                    "Poll deadline ({deadline:?}) is shorter than the poll interval ({:?})",
                    c.poll_interval
                )));
            }
        }
        if c.request_timeout_secs == 0 {
            return Err(OcrError::InvalidConfig(
                "Request timeout must be at least 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let c = OcrConfig::builder("sk-test").build().unwrap();
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.ocr_model, DEFAULT_OCR_MODEL);
        assert_eq!(c.poll_interval, Duration::from_secs(2));
        assert!(c.poll_deadline.is_none(), "no default deadline is invented");
        assert!(!c.include_image_base64);
    }

    #[test]
    fn empty_api_key_rejected() {
        let err = OcrConfig::builder("").build().unwrap_err();
        assert!(matches!(err, OcrError::InvalidConfig(_)));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let err = OcrConfig::builder("sk-test")
            .poll_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidConfig(_)));
    }

    #[test]
    fn deadline_shorter_than_interval_rejected() {
        let err = OcrConfig::builder("sk-test")
            .poll_interval(Duration::from_secs(10))
            .poll_deadline(Duration::from_secs(5))
            .build()
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidConfig(_)));
    }

    #[test]
    fn rebuilt_config_revalidates_overrides() {
        let config = OcrConfig::builder("sk-test").build().unwrap();
        let err = config
            .into_builder()
            .poll_interval(Duration::from_secs(5))
            .poll_deadline(Duration::from_secs(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = OcrConfig::builder("sk-very-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-very-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn metadata_tags_accumulate() {
        let c = OcrConfig::builder("sk-test")
            .job_metadata_tag("job_type", "demo")
            .job_metadata_tag("owner", "ops")
            .build()
            .unwrap();
        assert_eq!(c.job_metadata.get("job_type").map(String::as_str), Some("demo"));
        assert_eq!(c.job_metadata.len(), 2);
    }
}
