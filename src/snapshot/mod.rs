//! One-shot incident snapshot and periodic backend polling
//!
//! - `SnapshotSource`: the fetch seam (`load()`), one request per call, no retry
//! - `HttpSnapshotLoader`: `GET /incidents` over reqwest
//! - `BackendPoller`: optional periodic pull that feeds the same reconciler

mod loader;
mod poller;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Incident;

pub use loader::HttpSnapshotLoader;
pub use poller::{BackendPoller, PollOutcome};

/// The snapshot could not be loaded. Never fatal to a session.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend answered with status {status}")]
    Status { status: u16 },

    #[error("could not decode incident list: {0}")]
    Decode(String),
}

/// Source of the full incident list
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch every incident the backend currently knows, in server order
    async fn load(&self) -> Result<Vec<Incident>, FetchError>;
}
