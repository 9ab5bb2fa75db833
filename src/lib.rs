//! Incident Feed
//!
//! Client-side core of a live incident dashboard: keeps one ordered,
//! deduplicated view of an incident stream fed by a one-shot HTTP snapshot
//! and a reconnecting push channel.
//!
//! # Features
//!
//! - **Union-merge**: snapshot, bootstrap and polled batches never replace
//!   data that already arrived
//! - **Newest-first**: ordered by detection time, arrival order on ties
//! - **Highlights**: live incidents are flagged "new" for a dwell window
//! - **Resilient channel**: fixed-delay reconnect, forever, cancellable
//! - **Single owner**: one task mutates state, readers get `watch` snapshots
//!
//! # Modules
//!
//! - `types`: Incident, Severity, views and connection state
//! - `protocol`: push channel message decoding
//! - `snapshot`: `GET /incidents` loader and backend poller
//! - `channel`: live channel manager and WebSocket transport
//! - `reconciler`: the ordered, deduplicated incident store
//! - `session`: wires everything together and publishes views
//! - `config`: defaults, TOML file and environment overrides
//! - `utils`: timestamps and shutdown signalling
//!
//! # Example
//!
//! ```no_run
//! use incident_feed::{FeedConfig, Session};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Session::connect(&FeedConfig::from_env())?;
//!     let mut views = session.subscribe();
//!     while views.changed().await.is_ok() {
//!         let view = views.borrow_and_update().clone();
//!         println!("{} incidents", view.len());
//!     }
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod protocol;
pub mod reconciler;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use channel::{ChannelError, LiveChannelManager, LiveEvent, Transport, WebSocketTransport};
pub use config::FeedConfig;
pub use reconciler::IncidentReconciler;
pub use session::{Session, SessionHandle};
pub use snapshot::{FetchError, HttpSnapshotLoader, SnapshotSource};
pub use types::{
    BackendStatus, ConnectionState, Incident, IncidentStats, IncidentView, Severity,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
