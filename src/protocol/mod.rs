//! Wire protocol for the backend push channel
//!
//! Frames are JSON text with a `type` tag: `bootstrap` carries a full
//! incident batch, `incident` carries one new incident.

mod messages;

pub use messages::{decode_frame, MalformedMessage, ServerMessage};
