//! HTTP snapshot loader

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::{FetchError, SnapshotSource};
use crate::config::{ConfigError, FeedConfig};
use crate::types::Incident;

const USER_AGENT: &str = concat!("incident-feed/", env!("CARGO_PKG_VERSION"));

/// Loads the incident list with a single `GET /incidents`
#[derive(Debug, Clone)]
pub struct HttpSnapshotLoader {
    client: reqwest::Client,
    url: Url,
}

impl HttpSnapshotLoader {
    /// Loader for an explicit endpoint, with an optional request deadline
    pub fn new(url: Url, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url,
        })
    }

    /// Loader for the configured backend
    pub fn from_config(config: &FeedConfig) -> Result<Self, ConfigError> {
        let url = config.incidents_url()?;
        Self::new(url.clone(), config.request_timeout()).map_err(|e| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotLoader {
    async fn load(&self) -> Result<Vec<Incident>, FetchError> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let incidents: Vec<Incident> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        debug!(url = %self.url, count = incidents.len(), "snapshot loaded");
        Ok(incidents)
    }
}
