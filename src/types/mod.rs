//! Data types for the incident feed
//!
//! This module contains the core data structures shared by the loader,
//! the live channel, the reconciler and presentation consumers.

mod incident;
mod state;
mod stats;

pub use incident::{Incident, Severity};
pub use state::{BackendStatus, ConnectionState, IncidentView};
pub use stats::IncidentStats;
