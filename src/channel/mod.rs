//! Live push channel
//!
//! Keeps a push connection open for the lifetime of a session and forwards
//! decoded events to the reconciler.
//!
//! ## Features
//! - Explicit connect / receive / back-off loop, no recursion
//! - Unbounded retry with a fixed reconnect delay
//! - Connection state published through a `watch` channel
//! - Pluggable transport (`Transport` / `Connection`), WebSocket by default

mod manager;
mod websocket;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Incident;

pub use manager::LiveChannelManager;
pub use websocket::WebSocketTransport;

/// The push connection failed to open or dropped
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChannelError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed")]
    Closed,
}

/// Decoded push events, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Bootstrap(Vec<Incident>),
    Incident(Incident),
}

/// Opens push connections
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>, ChannelError>;
}

/// An open push connection yielding text frames
#[async_trait]
pub trait Connection: Send {
    /// Next text frame. `None` once the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<String, ChannelError>>;

    /// Release the underlying connection
    async fn close(&mut self);
}
