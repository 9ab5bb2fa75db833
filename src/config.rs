//! Feed configuration
//!
//! Resolution order: built-in defaults, optional TOML file, then
//! `INCIDENT_*` environment variables.

use std::env;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;
pub const DEFAULT_HIGHLIGHT_DWELL_MS: u64 = 5000;
/// Floor for the reconnect delay so a refused connection cannot spin
pub const MIN_RECONNECT_DELAY_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Connection and timing settings for a feed session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// HTTP base of the backend, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Push channel URL; derived from `base_url` when unset
    pub ws_url: Option<String>,
    pub reconnect_delay_ms: u64,
    pub highlight_dwell_ms: u64,
    /// Backend status polling; disabled when unset
    pub poll_interval_ms: Option<u64>,
    /// Snapshot request deadline; none when unset
    pub request_timeout_ms: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_url: None,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            highlight_dwell_ms: DEFAULT_HIGHLIGHT_DWELL_MS,
            poll_interval_ms: None,
            request_timeout_ms: None,
        }
    }
}

impl FeedConfig {
    /// Config pointing at a specific backend
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Override fields from `INCIDENT_*` environment variables.
    /// Unparseable numeric values are ignored.
    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var("INCIDENT_API_URL") {
            self.base_url = url;
        }
        if let Ok(url) = env::var("INCIDENT_WS_URL") {
            self.ws_url = Some(url);
        }
        if let Some(ms) = env_millis("INCIDENT_RECONNECT_DELAY_MS") {
            self.reconnect_delay_ms = ms;
        }
        if let Some(ms) = env_millis("INCIDENT_HIGHLIGHT_DWELL_MS") {
            self.highlight_dwell_ms = ms;
        }
        if let Some(ms) = env_millis("INCIDENT_POLL_INTERVAL_MS") {
            self.poll_interval_ms = Some(ms);
        }
        if let Some(ms) = env_millis("INCIDENT_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = Some(ms);
        }
    }

    /// `GET` endpoint for the incident snapshot
    pub fn incidents_url(&self) -> Result<Url, ConfigError> {
        parse_url(&self.base_url)?
            .join("incidents")
            .map_err(|e| invalid(&self.base_url, e))
    }

    /// Push channel endpoint: explicit `ws_url`, or `base_url` with a
    /// `ws`/`wss` scheme and `/ws` path
    pub fn channel_url(&self) -> Result<Url, ConfigError> {
        if let Some(ws) = &self.ws_url {
            return Url::parse(ws).map_err(|e| invalid(ws, e));
        }

        let mut url = parse_url(&self.base_url)?
            .join("ws")
            .map_err(|e| invalid(&self.base_url, e))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            reason: format!("cannot switch scheme to {}", scheme),
        })?;
        Ok(url)
    }

    /// Configured delay, never below `MIN_RECONNECT_DELAY_MS`
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms.max(MIN_RECONNECT_DELAY_MS))
    }

    pub fn highlight_dwell(&self) -> Duration {
        Duration::from_millis(self.highlight_dwell_ms)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Parse a base URL, making sure relative joins keep its path
fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|e| invalid(raw, e))
}

fn invalid(url: &str, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

fn env_millis(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
