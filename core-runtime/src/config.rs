//! # Core Configuration Module
//!
//! Provides configuration management for the calendar core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and the event store settings. It
//! enforces fail-fast validation so a misconfigured host learns about it at
//! startup rather than on the first write.
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//!
//! When the `desktop-shims` feature is enabled, a `ReqwestHttpClient` using
//! the configured request timeout is injected if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, StoreSettings};
//!
//! let config = CoreConfig::builder()
//!     .store_settings(StoreSettings::default().with_max_write_attempts(5))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Environment
//!
//! [`StoreSettings::from_env`] reads the following variables, falling back to
//! defaults for any that are unset:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `CALENDAR_DOCUMENT_PATH` | `document_path` |
//! | `CALENDAR_API_BASE` | `api_base_url` |
//! | `CALENDAR_MAX_WRITE_ATTEMPTS` | `max_write_attempts` |
//! | `CALENDAR_REQUEST_TIMEOUT_SECS` | `request_timeout` |
//! | `CALENDAR_CONCURRENCY_MODE` | `concurrency_mode` (`auto` / `heuristic`) |

use crate::error::{Error, Result};
use bridge_traits::HttpClient;
use std::sync::Arc;
use std::time::Duration;

/// Default location of the calendar document, relative to the drive root.
pub const DEFAULT_DOCUMENT_PATH: &str = "Documents/calendar-events.json";

/// Default Microsoft Graph endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// How the event store guards its read-modify-write cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// Use version-conditional writes whenever the blob store supports them,
    /// falling back to the id-set diff otherwise.
    #[default]
    Auto,
    /// Always re-read and diff id-sets before an unconditional write.
    Heuristic,
}

impl ConcurrencyMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" | "conditional" => Some(ConcurrencyMode::Auto),
            "heuristic" | "diff" => Some(ConcurrencyMode::Heuristic),
            _ => None,
        }
    }
}

/// On-disk layout used when the store creates a new document.
///
/// Existing documents are always rewritten in the layout they were read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentLayout {
    /// A bare JSON array of events (readable by the legacy web client)
    #[default]
    LegacyArray,
    /// `{"version": 1, "events": [...]}`
    Versioned,
}

/// Settings for the remote event store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Logical path of the backing document within the drive
    pub document_path: String,

    /// Base URL of the remote blob API
    pub api_base_url: String,

    /// Timeout applied to every network call
    pub request_timeout: Duration,

    /// Upper bound on read-modify-write attempts per mutation
    pub max_write_attempts: u32,

    /// First backoff delay after a write conflict
    pub backoff_base: Duration,

    /// Cap on a single backoff delay
    pub backoff_max: Duration,

    pub concurrency_mode: ConcurrencyMode,

    pub document_layout: DocumentLayout,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            document_path: DEFAULT_DOCUMENT_PATH.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            max_write_attempts: 3,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_secs(2),
            concurrency_mode: ConcurrencyMode::Auto,
            document_layout: DocumentLayout::LegacyArray,
        }
    }
}

impl StoreSettings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(path) = lookup("CALENDAR_DOCUMENT_PATH") {
            settings.document_path = path;
        }

        if let Some(base) = lookup("CALENDAR_API_BASE") {
            settings.api_base_url = base;
        }

        if let Some(raw) = lookup("CALENDAR_MAX_WRITE_ATTEMPTS") {
            settings.max_write_attempts = raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "CALENDAR_MAX_WRITE_ATTEMPTS must be a positive integer, got '{}'",
                    raw
                ))
            })?;
        }

        if let Some(raw) = lookup("CALENDAR_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "CALENDAR_REQUEST_TIMEOUT_SECS must be a number of seconds, got '{}'",
                    raw
                ))
            })?;
            settings.request_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("CALENDAR_CONCURRENCY_MODE") {
            settings.concurrency_mode = ConcurrencyMode::parse(&raw).ok_or_else(|| {
                Error::Config(format!(
                    "CALENDAR_CONCURRENCY_MODE must be 'auto' or 'heuristic', got '{}'",
                    raw
                ))
            })?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn with_document_path(mut self, path: impl Into<String>) -> Self {
        self.document_path = path.into();
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    pub fn with_concurrency_mode(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    pub fn with_document_layout(mut self, layout: DocumentLayout) -> Self {
        self.document_layout = layout;
        self
    }

    /// Validates the settings and returns an error if invalid.
    ///
    /// This checks:
    /// - Document path is a non-empty relative path
    /// - API base URL is an http(s) URL
    /// - Timeout and attempt bound are non-zero
    /// - Backoff cap is not below the base delay
    pub fn validate(&self) -> Result<()> {
        let path = self.document_path.trim();
        if path.is_empty() {
            return Err(Error::Config("Document path cannot be empty".to_string()));
        }

        if path.starts_with('/') || path.ends_with('/') {
            return Err(Error::Config(format!(
                "Document path must be relative to the drive root and name a file, got '{}'",
                self.document_path
            )));
        }

        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(Error::Config(format!(
                "API base URL must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.max_write_attempts == 0 {
            return Err(Error::Config(
                "max_write_attempts must be at least 1".to_string(),
            ));
        }

        if self.backoff_max < self.backoff_base {
            return Err(Error::Config(
                "Backoff cap must not be smaller than the base delay".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration for the calendar core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// HTTP client for making API requests
    pub http_client: Arc<dyn HttpClient>,

    /// Event store settings
    pub store: StoreSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("store", &self.store)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(settings: &StoreSettings) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(settings.request_timeout)
        .map_err(|e| Error::Internal(format!("Failed to initialize default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_settings: &StoreSettings) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Other hosts: inject a platform-native adapter with .http_client()."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    store: Option<StoreSettings>,
}

impl CoreConfigBuilder {
    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the event store settings.
    ///
    /// Default: [`StoreSettings::default`]
    pub fn store_settings(mut self, settings: StoreSettings) -> Self {
        self.store = Some(settings);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if:
    /// - No `HttpClient` was provided and no platform default is available
    /// - Store settings are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let store = self.store.unwrap_or_default();
        store.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(&store)?,
        };

        Ok(CoreConfig { http_client, store })
    }
}
