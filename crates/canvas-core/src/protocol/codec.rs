//! Text-frame codec for the browser protocol.
//!
//! Thin wrappers over `serde_json` that give callers a single error type to
//! match on.  Decoding failures are [`ProtocolError::InvalidPayload`]: the
//! caller logs and drops the frame, and the connection stays open.

use thiserror::Error;

use crate::protocol::messages::{ClientMessage, ServerMessage};

/// Errors produced while decoding or encoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON, names an unknown kind, or has the wrong shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// A server message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Parses one WebSocket text frame sent by a browser.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidPayload`] for anything that is not one of
/// the four client message kinds with a well-formed payload.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::InvalidPayload)
}

/// Serializes a server message into the text of one WebSocket frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.  With the
/// current message types this only happens for non-finite coordinates,
/// which the decoder never produces.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(ProtocolError::Encode)
}
