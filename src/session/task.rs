//! The single task that owns the reconciler

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::LiveEvent;
use crate::reconciler::{HighlightExpired, IncidentReconciler};
use crate::snapshot::{FetchError, PollOutcome};
use crate::types::{BackendStatus, Incident, IncidentView};
use crate::utils::ShutdownSignal;

pub(super) type SnapshotTask = JoinHandle<Result<Vec<Incident>, FetchError>>;

/// Inputs and outputs of the session loop
pub(super) struct SessionTask {
    pub reconciler: IncidentReconciler,
    pub expired_rx: mpsc::UnboundedReceiver<HighlightExpired>,
    pub events_rx: mpsc::Receiver<LiveEvent>,
    pub poll_rx: Option<mpsc::Receiver<PollOutcome>>,
    pub snapshot: Option<SnapshotTask>,
    pub view_tx: watch::Sender<Arc<IncidentView>>,
    pub status_tx: watch::Sender<BackendStatus>,
    pub shutdown: ShutdownSignal,
}

impl SessionTask {
    /// Apply inputs until shutdown. When several are ready at once they
    /// are taken in a fixed order: shutdown, live channel, snapshot, poll,
    /// highlight expiry.
    pub async fn run(mut self) {
        loop {
            let changed = tokio::select! {
                biased;

                _ = self.shutdown.recv() => break,

                Some(event) = self.events_rx.recv() => match event {
                    LiveEvent::Bootstrap(items) => self.reconciler.apply_bootstrap(items) > 0,
                    LiveEvent::Incident(incident) => self.reconciler.apply_incident(incident),
                },

                joined = wait_optional(&mut self.snapshot) => {
                    self.snapshot = None;
                    match joined {
                        Ok(Ok(incidents)) => {
                            self.reconciler.apply_snapshot(incidents);
                            true
                        }
                        Ok(Err(e)) => {
                            warn!(error = %e, "snapshot unavailable, continuing with live data only");
                            false
                        }
                        Err(e) => {
                            warn!(error = %e, "snapshot task did not complete");
                            false
                        }
                    }
                }

                Some(outcome) = recv_optional(&mut self.poll_rx) => self.handle_poll(outcome),

                Some(expired) = self.expired_rx.recv() => self.reconciler.expire(&expired),
            };

            if changed {
                self.publish();
            }
        }

        if let Some(snapshot) = self.snapshot.take() {
            snapshot.abort();
        }
        self.reconciler.cancel_highlights();
        info!(
            incidents = self.reconciler.collection().len(),
            "session stopped"
        );
    }

    fn handle_poll(&mut self, outcome: PollOutcome) -> bool {
        let status = outcome.status(&self.status_tx.borrow());
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            if current.reachable != status.reachable {
                info!(reachable = status.reachable, "backend status changed");
            }
            *current = status;
            true
        });

        match outcome.result {
            Ok(incidents) => self.reconciler.apply_poll(incidents) > 0,
            Err(_) => false,
        }
    }

    fn publish(&self) {
        let view = Arc::new(self.reconciler.current_state());
        debug!(
            incidents = view.len(),
            highlighted = view.highlighted.len(),
            "view published"
        );
        self.view_tx.send_replace(view);
    }
}

/// Await an optional task, pending forever once it is gone
async fn wait_optional<F>(fut: &mut Option<F>) -> F::Output
where
    F: Future + Unpin,
{
    match fut {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn recv_optional<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
