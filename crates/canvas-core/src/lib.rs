//! # canvas-core
//!
//! Shared library for the shared-canvas server containing the drawing log,
//! the presence registry, and the JSON wire protocol.
//!
//! It has zero dependencies on sockets, async runtimes, or UI frameworks, so
//! every type here can be unit-tested in isolation.
//!
//! # Architecture overview
//!
//! Many participants draw on one canvas at the same time.  Each mouse
//! movement while drawing produces one straight [`Segment`]; the server keeps
//! every accepted segment in a single ordered [`SessionLog`] and replays it to
//! anyone who joins late.  Alongside the log, a [`PresenceRegistry`] tracks
//! who is connected, which color they were given, and where their cursor is.
//!
//! - **`domain`** – The log, the registry, and the geometry they are built
//!   from.  Pure data structures with no I/O.
//!
//! - **`protocol`** – The closed set of messages exchanged with browsers and
//!   the JSON codec that turns them into WebSocket text frames.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `canvas_core::SessionLog` instead of `canvas_core::domain::session_log::SessionLog`.
pub use domain::geometry::{ConnectionId, Point, Segment};
pub use domain::presence::{random_hex_color, PresenceEntry, PresenceError, PresenceRegistry};
pub use domain::session_log::SessionLog;
pub use protocol::codec::{decode_client_message, encode_server_message, ProtocolError};
pub use protocol::messages::{ClientMessage, CursorUpdate, ServerMessage, UserView};
