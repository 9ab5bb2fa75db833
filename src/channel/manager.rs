//! Live channel manager: connect, receive, back off, reconnect

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::{ChannelError, Connection, LiveEvent, Transport};
use crate::protocol::{decode_frame, ServerMessage};
use crate::types::ConnectionState;
use crate::utils::ShutdownSignal;

/// Why a connected phase ended
enum PumpEnd {
    /// Peer closed or the transport failed
    Dropped(Option<ChannelError>),
    /// Shutdown requested or the event consumer went away
    Stop,
}

/// Owns the push connection lifecycle.
///
/// ```text
/// CONNECTING ──open ok──► CONNECTED ──closed/error──┐
///     │                                             ▼
///     └──────open failed──────────────────────► DISCONNECTED
///                                                   │ reconnect delay
///     CONNECTING ◄──────────────────────────────────┘
/// ```
pub struct LiveChannelManager<T: Transport> {
    transport: T,
    reconnect_delay: Duration,
    state: watch::Sender<ConnectionState>,
    events: mpsc::Sender<LiveEvent>,
}

impl<T: Transport> LiveChannelManager<T> {
    pub fn new(transport: T, reconnect_delay: Duration, events: mpsc::Sender<LiveEvent>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            transport,
            reconnect_delay,
            state,
            events,
        }
    }

    /// Observe connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Run until shutdown. Retries forever; never returns on its own unless
    /// the event consumer has gone away.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            self.set_state(ConnectionState::Connecting);

            let opened = tokio::select! {
                _ = shutdown.recv() => break,
                opened = self.transport.connect() => opened,
            };

            match opened {
                Ok(mut conn) => {
                    info!(attempt, "push channel connected");
                    self.set_state(ConnectionState::Connected);

                    let end = self.pump(conn.as_mut(), &mut shutdown).await;
                    conn.close().await;

                    match end {
                        PumpEnd::Stop => break,
                        PumpEnd::Dropped(Some(e)) => warn!(error = %e, "push channel dropped"),
                        PumpEnd::Dropped(None) => info!("push channel closed by peer"),
                    }
                }
                Err(e) => warn!(attempt, error = %e, "push channel connect failed"),
            }

            self.set_state(ConnectionState::Disconnected);
            debug!(delay_ms = self.reconnect_delay.as_millis() as u64, "reconnect scheduled");

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        debug!(attempts = attempt, "push channel manager stopped");
    }

    /// Forward frames from an open connection until it ends
    async fn pump(&self, conn: &mut dyn Connection, shutdown: &mut ShutdownSignal) -> PumpEnd {
        loop {
            let frame = tokio::select! {
                _ = shutdown.recv() => return PumpEnd::Stop,
                frame = conn.recv() => frame,
            };

            let text = match frame {
                None => return PumpEnd::Dropped(None),
                Some(Err(e)) => return PumpEnd::Dropped(Some(e)),
                Some(Ok(text)) => text,
            };

            let event = match decode_frame(&text) {
                Ok(Some(ServerMessage::Bootstrap { items })) => LiveEvent::Bootstrap(items),
                Ok(Some(ServerMessage::Incident { data })) => LiveEvent::Incident(data),
                Ok(None) => {
                    debug!("ignoring push message of unknown type");
                    continue;
                }
                Err(e) => {
                    debug!(error = %e, "discarding malformed push frame");
                    continue;
                }
            };

            if self.events.send(event).await.is_err() {
                return PumpEnd::Stop;
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = %current, to = %next, "connection state");
            *current = next;
            true
        });
    }
}
