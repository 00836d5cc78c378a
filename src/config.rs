//! Runtime configuration.
//!
//! Built with the builder methods or read from the environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DEBUGSCOPE_BASE_URL` | `http://127.0.0.1:8000` |
//! | `DEBUGSCOPE_API_KEY` | unset |
//! | `DEBUGSCOPE_USER_ID` | `admin` |
//! | `DEBUGSCOPE_POLL_MS` | `1000` |
//! | `DEBUGSCOPE_SETTLE_STEP_MS` | `120` |
//! | `DEBUGSCOPE_SETTLE_CAP_MS` | `3000` |

use std::sync::Arc;
use std::time::Duration;

use crate::client::{DebugApiClient, DEFAULT_BASE_URL, DEFAULT_USER_ID};
use crate::error::{DebugError, DebugResult};
use crate::stream::{StreamSettings, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_CAP, DEFAULT_SETTLE_STEP};
use crate::traits::HttpClient;

pub const ENV_BASE_URL: &str = "DEBUGSCOPE_BASE_URL";
pub const ENV_API_KEY: &str = "DEBUGSCOPE_API_KEY";
pub const ENV_USER_ID: &str = "DEBUGSCOPE_USER_ID";
pub const ENV_POLL_MS: &str = "DEBUGSCOPE_POLL_MS";
pub const ENV_SETTLE_STEP_MS: &str = "DEBUGSCOPE_SETTLE_STEP_MS";
pub const ENV_SETTLE_CAP_MS: &str = "DEBUGSCOPE_SETTLE_CAP_MS";

/// Configuration for talking to one agent backend.
///
/// # Example
///
/// ```ignore
/// use debugscope::config::DebugConfig;
///
/// let config = DebugConfig::default()
///     .with_base_url("http://localhost:8000")
///     .with_poll_interval(std::time::Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DebugConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub user_id: String,
    pub poll_interval: Duration,
    pub settle_step: Duration,
    pub settle_cap: Duration,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            user_id: DEFAULT_USER_ID.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_step: DEFAULT_SETTLE_STEP,
            settle_cap: DEFAULT_SETTLE_CAP,
        }
    }
}

impl DebugConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the cancel-settle step and cap.
    pub fn with_settle(mut self, step: Duration, cap: Duration) -> Self {
        self.settle_step = step;
        self.settle_cap = cap;
        self
    }

    /// Read the configuration from `DEBUGSCOPE_*` variables.
    ///
    /// Unset or empty variables keep their defaults. Unparseable durations
    /// are a configuration error.
    pub fn from_env() -> DebugResult<Self> {
        let mut config = Self::default();
        if let Some(url) = env_value(ENV_BASE_URL) {
            config.base_url = url;
        }
        config.api_key = env_value(ENV_API_KEY);
        if let Some(user_id) = env_value(ENV_USER_ID) {
            config.user_id = user_id;
        }
        if let Some(ms) = env_millis(ENV_POLL_MS)? {
            config.poll_interval = ms;
        }
        if let Some(ms) = env_millis(ENV_SETTLE_STEP_MS)? {
            config.settle_step = ms;
        }
        if let Some(ms) = env_millis(ENV_SETTLE_CAP_MS)? {
            config.settle_cap = ms;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DebugResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(DebugError::Configuration {
                key: ENV_BASE_URL.to_string(),
                message: format!("expected an http(s) URL, got '{}'", self.base_url),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(DebugError::Configuration {
                key: ENV_POLL_MS.to_string(),
                message: "poll interval must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            poll_interval: self.poll_interval,
            settle_step: self.settle_step,
            settle_cap: self.settle_cap,
        }
    }

    /// API client over `http` with this configuration.
    pub fn api_client(&self, http: Arc<dyn HttpClient>) -> DebugApiClient {
        DebugApiClient::new(http, &self.base_url)
            .with_api_key(self.api_key.clone())
            .with_user_id(&self.user_id)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_millis(key: &str) -> DebugResult<Option<Duration>> {
    env_value(key)
        .map(|raw| {
            raw.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| DebugError::Configuration {
                    key: key.to_string(),
                    message: format!("'{}' is not a millisecond count: {}", raw, e),
                })
        })
        .transpose()
}
