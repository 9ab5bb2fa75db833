//! Read-only state published to presentation layers

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::incident::Incident;
use super::stats::IncidentStats;

/// Push channel connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Point-in-time copy of the incident collection and highlight set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncidentView {
    /// Newest first
    pub incidents: Vec<Incident>,
    /// Ids currently flagged "new"
    pub highlighted: HashSet<String>,
}

impl IncidentView {
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Whether `id` is currently highlighted
    pub fn is_new(&self, id: &str) -> bool {
        self.highlighted.contains(id)
    }

    /// Ids in collection order
    pub fn ids(&self) -> Vec<&str> {
        self.incidents.iter().map(|i| i.id.as_str()).collect()
    }

    /// Timestamp of the newest incident
    pub fn last_detection(&self) -> Option<DateTime<Utc>> {
        self.incidents.first().map(|i| i.timestamp)
    }

    /// Statistics over this view with presentation-supplied parameters
    pub fn stats(&self, now: DateTime<Utc>, window: Duration, threshold: f64) -> IncidentStats {
        IncidentStats::compute(&self.incidents, now, window, threshold)
    }
}

/// Result of the periodic backend status check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub reachable: bool,
    pub last_detection: Option<DateTime<Utc>>,
    pub checked_at: DateTime<Utc>,
}

impl BackendStatus {
    /// Status before the first check completes
    pub fn unknown() -> Self {
        Self {
            reachable: false,
            last_detection: None,
            checked_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
