//! Incident record as delivered by the monitoring backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::time::timestamp;

/// A single detection pushed by the backend. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub label: String,
    /// Detector confidence, clamped into `[0, 1]` on decode and in `new`.
    /// Values outside that range are not rejected.
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: f64,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub camera_id: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Base64 encoded frame captured at detection time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Incident {
    /// Create an incident with the required fields only
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        confidence: f64,
        camera_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            confidence: clamp_confidence(confidence),
            summary: String::new(),
            location: None,
            camera_id: camera_id.into(),
            timestamp,
            frame: None,
            metadata: None,
        }
    }

    /// Severity bucket derived from the detector confidence
    pub fn severity(&self) -> Severity {
        Severity::from_confidence(self.confidence)
    }
}

/// Pin a confidence into `[0, 1]`; NaN counts as no confidence
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_confidence)
}

/// Coarse risk classification used for emphasis in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// `> 0.8` is high, `> 0.6` is medium, anything else is low
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.8 {
            Severity::High
        } else if confidence > 0.6 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}
