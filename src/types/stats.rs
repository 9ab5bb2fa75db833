//! Derived incident statistics

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::incident::Incident;

/// Counts shown in the dashboard header. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentStats {
    pub total: usize,
    /// Incidents detected less than `window` before `now`
    pub recent: usize,
    /// Incidents with confidence strictly above the threshold
    pub above_threshold: usize,
}

impl IncidentStats {
    pub fn compute(
        incidents: &[Incident],
        now: DateTime<Utc>,
        window: Duration,
        threshold: f64,
    ) -> Self {
        incidents.iter().fold(Self::default(), |mut stats, incident| {
            stats.total += 1;
            if now - incident.timestamp < window {
                stats.recent += 1;
            }
            if incident.confidence > threshold {
                stats.above_threshold += 1;
            }
            stats
        })
    }
}
