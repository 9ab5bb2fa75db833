//! Session - wires snapshot, push channel and reconciler together
//!
//! A session spawns:
//! - the one-shot snapshot load
//! - the live channel manager
//! - the backend poller, when a poll interval is configured
//! - one task that owns the [`IncidentReconciler`](crate::reconciler::IncidentReconciler)
//!
//! Presentation only reads through [`SessionHandle`]: views, connection
//! state and backend status are published on `watch` channels.
//!
//! ```no_run
//! use incident_feed::{FeedConfig, Session};
//!
//! # async fn run() -> Result<(), incident_feed::config::ConfigError> {
//! let session = Session::connect(&FeedConfig::from_env())?;
//! let view = session.current_state();
//! println!("{} incidents, {} new", view.len(), view.highlighted.len());
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod task;

use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::channel::{LiveChannelManager, Transport, WebSocketTransport};
use crate::config::{ConfigError, FeedConfig};
use crate::reconciler::IncidentReconciler;
use crate::snapshot::{BackendPoller, HttpSnapshotLoader, SnapshotSource};
use crate::types::{BackendStatus, ConnectionState, IncidentView};
use crate::utils::{shutdown_pair, ShutdownTrigger};

use task::SessionTask;

const EVENT_BUFFER: usize = 64;
const POLL_BUFFER: usize = 4;

/// Entry point for starting sessions
pub struct Session;

impl Session {
    /// Start a session against the backend described by `config`, using
    /// HTTP for the snapshot and a WebSocket for the push channel.
    /// Must be called within a Tokio runtime.
    pub fn connect(config: &FeedConfig) -> Result<SessionHandle, ConfigError> {
        let loader = HttpSnapshotLoader::from_config(config)?;
        let transport = WebSocketTransport::new(config.channel_url()?);
        info!(
            snapshot = %loader.url(),
            channel = %transport.url(),
            "starting incident session"
        );
        Ok(Self::spawn(config, loader, transport))
    }

    /// Start a session with explicit collaborators.
    /// Must be called within a Tokio runtime.
    pub fn spawn<S, T>(config: &FeedConfig, snapshot: S, transport: T) -> SessionHandle
    where
        S: SnapshotSource + 'static,
        T: Transport + 'static,
    {
        let source: Arc<dyn SnapshotSource> = Arc::new(snapshot);
        let (trigger, signal) = shutdown_pair();

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let manager = LiveChannelManager::new(transport, config.reconnect_delay(), events_tx);
        let connection_rx = manager.subscribe_state();
        let manager_task = tokio::spawn(manager.run(signal.clone()));

        let snapshot_source = source.clone();
        let snapshot_task = tokio::spawn(async move { snapshot_source.load().await });

        let (poll_rx, poller_task) = match config.poll_interval() {
            Some(period) => {
                let (poll_tx, poll_rx) = mpsc::channel(POLL_BUFFER);
                let poller = BackendPoller::new(source, period);
                let handle = tokio::spawn(poller.run(poll_tx, signal.clone()));
                (Some(poll_rx), Some(handle))
            }
            None => (None, None),
        };

        let (reconciler, expired_rx) = IncidentReconciler::new(config.highlight_dwell());
        let (view_tx, view_rx) = watch::channel(Arc::new(IncidentView::default()));
        let (status_tx, status_rx) = watch::channel(BackendStatus::unknown());

        let task = SessionTask {
            reconciler,
            expired_rx,
            events_rx,
            poll_rx,
            snapshot: Some(snapshot_task),
            view_tx,
            status_tx,
            shutdown: signal,
        };
        let session_task = tokio::spawn(task.run());

        SessionHandle {
            trigger,
            view_rx,
            connection_rx,
            status_rx,
            manager_task,
            poller_task,
            session_task,
        }
    }
}

/// Read access to a running session, and its teardown
pub struct SessionHandle {
    trigger: ShutdownTrigger,
    view_rx: watch::Receiver<Arc<IncidentView>>,
    connection_rx: watch::Receiver<ConnectionState>,
    status_rx: watch::Receiver<BackendStatus>,
    manager_task: JoinHandle<()>,
    poller_task: Option<JoinHandle<()>>,
    session_task: JoinHandle<()>,
}

impl SessionHandle {
    /// Latest published view
    pub fn current_state(&self) -> Arc<IncidentView> {
        self.view_rx.borrow().clone()
    }

    /// Receiver notified after every change to the collection or the
    /// highlight set
    pub fn subscribe(&self) -> watch::Receiver<Arc<IncidentView>> {
        self.view_rx.clone()
    }

    /// Views as a stream, starting with the current one
    pub fn updates(&self) -> impl Stream<Item = Arc<IncidentView>> {
        WatchStream::new(self.view_rx.clone())
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection_rx.borrow()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_rx.clone()
    }

    /// Latest poll result; `BackendStatus::unknown()` until the first poll
    /// or when polling is disabled
    pub fn backend_status(&self) -> BackendStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe_backend_status(&self) -> watch::Receiver<BackendStatus> {
        self.status_rx.clone()
    }

    /// Stop the push channel, abort background work and cancel every
    /// highlight timer. Returns once all session tasks have exited.
    pub async fn shutdown(self) {
        self.trigger.trigger();

        if let Err(e) = self.manager_task.await {
            debug!(error = %e, "channel manager task ended abnormally");
        }
        if let Some(poller) = self.poller_task {
            poller.abort();
            let _ = poller.await;
        }
        if let Err(e) = self.session_task.await {
            debug!(error = %e, "session task ended abnormally");
        }

        info!("session shut down");
    }
}
