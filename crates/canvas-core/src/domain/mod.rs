//! Domain entities for the shared canvas.
//!
//! This module contains pure session state with no infrastructure
//! dependencies.  Code in outer layers (the coordinator, the WebSocket
//! server) depends on these types, but they never depend on the outer layers.

/// Points, segments, and connection identity.
pub mod geometry;

/// Presence registry: who is connected, their color and cursor position.
pub mod presence;

/// Ordered log of accepted drawing segments.
///
/// See [`session_log::SessionLog`] for the main type.
pub mod session_log;
