//! Utility functions and helpers
//!
//! This module contains timestamp helpers and the shutdown signal used by
//! background loops.

pub mod shutdown;
pub mod time;

pub use shutdown::{shutdown_pair, ShutdownSignal, ShutdownTrigger};
pub use time::{format_relative, now_utc, parse_timestamp};
