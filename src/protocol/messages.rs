//! Push channel message types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::Incident;

/// Messages the backend pushes over the live channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full incident batch, sent on connect and possibly again later
    Bootstrap { items: Vec<Incident> },

    /// A single newly detected incident
    Incident { data: Incident },
}

impl ServerMessage {
    /// The `type` tag as sent on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Bootstrap { .. } => "bootstrap",
            ServerMessage::Incident { .. } => "incident",
        }
    }
}

/// A received frame could not be understood
#[derive(Debug, Error, PartialEq)]
pub enum MalformedMessage {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("frame has no string `type` field")]
    MissingType,

    #[error("invalid `{kind}` payload: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

/// Decode a text frame.
///
/// Returns `Ok(None)` for well-formed frames of a kind this client does not
/// handle; those are ignored without error.
pub fn decode_frame(text: &str) -> Result<Option<ServerMessage>, MalformedMessage> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| MalformedMessage::InvalidJson(e.to_string()))?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(MalformedMessage::MissingType)?
        .to_string();

    if !matches!(kind.as_str(), "bootstrap" | "incident") {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| MalformedMessage::InvalidPayload {
            kind,
            reason: e.to_string(),
        })
}
