//! Connection settings shared by the provider and the transport.

use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use folio_core::ProjectUrl;
use folio_core::error::{Error, InvalidInputError};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

const DEFAULT_REFRESH_SKEW_SECONDS: i64 = 60;

/// Where the project lives and how to talk to it.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Project base URL.
    pub project_url: ProjectUrl,
    /// Public API key sent as the `apikey` header.
    pub api_key: String,
    /// Tokens expiring sooner than this are refreshed before use.
    #[serde(default = "default_refresh_skew")]
    pub refresh_skew_seconds: i64,
    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl ClientConfig {
    /// Create a config with default skew and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty.
    pub fn new(project_url: ProjectUrl, api_key: impl Into<String>) -> Result<Self, Error> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(InvalidInputError::Other {
                message: "API key must not be empty".to_string(),
            }
            .into());
        }

        Ok(Self {
            project_url,
            api_key,
            refresh_skew_seconds: DEFAULT_REFRESH_SKEW_SECONDS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        })
    }

    pub fn with_refresh_skew_seconds(mut self, seconds: i64) -> Self {
        self.refresh_skew_seconds = seconds;
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn refresh_skew(&self) -> Duration {
        Duration::seconds(self.refresh_skew_seconds)
    }

    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.timeout_seconds)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("project_url", &self.project_url)
            .field("api_key", &"[REDACTED]")
            .field("refresh_skew_seconds", &self.refresh_skew_seconds)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

fn default_refresh_skew() -> i64 {
    DEFAULT_REFRESH_SKEW_SECONDS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}
