//! JSON message types for the browser-facing WebSocket protocol.
//!
//! # Message flow
//!
//! ```text
//! Browser → Server:  JSON text frame  →  ClientMessage
//! Server  → Browser: ServerMessage    →  JSON text frame
//! ```
//!
//! # JSON discriminant
//!
//! Every message is a JSON object with a `"type"` field naming the message
//! kind and, when the kind carries a payload, a `"data"` field holding it:
//!
//! ```json
//! {"type":"cursor-move","data":{"x":100,"y":200}}
//! {"type":"undo"}
//! ```
//!
//! The payload sits under its own key (serde's adjacent tagging) because
//! some payloads, like `initial-history`, are arrays rather than objects.
//!
//! # Why two enums?
//!
//! The two directions carry different kinds.  Keeping them separate makes it
//! a compile-time error to send a client-only message to a browser, and the
//! closed enums mean a misspelt kind is rejected at decode time instead of
//! being silently ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::geometry::{ConnectionId, Point, Segment};
use crate::domain::presence::PresenceEntry;

// ── Browser → Server messages ─────────────────────────────────────────────────

/// All messages a browser can send to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// The sender drew one segment.  Relayed to everyone else.
    DrawLine(Segment),

    /// Remove the most recent segment in the shared log, whoever drew it.
    Undo,

    /// Wipe the shared log.
    Clear,

    /// The sender's cursor moved.
    CursorMove(Point),
}

impl ClientMessage {
    /// Wire name of this message kind, for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::DrawLine(_) => "draw-line",
            ClientMessage::Undo => "undo",
            ClientMessage::Clear => "clear",
            ClientMessage::CursorMove(_) => "cursor-move",
        }
    }
}

// ── Server → Browser messages ─────────────────────────────────────────────────

/// All messages the server sends to browsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// The whole log in order.  Sent to a new connection on join, and to
    /// everyone after an undo.  Receivers blank their surface and replay it.
    InitialHistory(Vec<Segment>),

    /// One segment drawn by another participant.
    DrawLine(Segment),

    /// Blank the local surface before the next history or draw arrives.
    CanvasClear,

    /// Full membership, keyed by connection id.
    UsersUpdate(BTreeMap<ConnectionId, UserView>),

    /// One participant's cursor moved.
    CursorUpdate(CursorUpdate),
}

impl ServerMessage {
    /// Wire name of this message kind, for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::InitialHistory(_) => "initial-history",
            ServerMessage::DrawLine(_) => "draw-line",
            ServerMessage::CanvasClear => "canvas-clear",
            ServerMessage::UsersUpdate(_) => "users-update",
            ServerMessage::CursorUpdate(_) => "cursor-update",
        }
    }

    /// Builds a `users-update` from a presence snapshot.
    pub fn users_update(snapshot: &BTreeMap<ConnectionId, PresenceEntry>) -> Self {
        ServerMessage::UsersUpdate(
            snapshot
                .iter()
                .map(|(id, entry)| (*id, UserView::from(entry)))
                .collect(),
        )
    }
}

/// One participant as shown in `users-update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub color: String,
    pub x: f64,
    pub y: f64,
}

impl From<&PresenceEntry> for UserView {
    fn from(entry: &PresenceEntry) -> Self {
        Self {
            color: entry.color.clone(),
            x: entry.position.x,
            y: entry.position.y,
        }
    }
}

/// Payload of `cursor-update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorUpdate {
    pub id: ConnectionId,
    pub pos: Point,
    pub color: String,
}
