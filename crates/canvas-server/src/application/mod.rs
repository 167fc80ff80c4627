//! Application layer for canvas-server.
//!
//! The application layer owns the session state and decides *who* receives
//! *what*.  It delegates the actual byte pushing to the infrastructure layer
//! through the [`MessageSink`] trait.
//!
//! # Responsibilities
//!
//! - Applying inbound messages to the session log and presence registry
//! - Choosing the audience for each resulting broadcast
//! - Fanning a message out to exactly that audience
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or listening for connections (that is infrastructure)
//! - WebSocket framing (handled by tokio-tungstenite)
//! - JSON encoding (done by the per-connection writer task)

pub mod coordinator;
pub mod router;

pub use coordinator::{SessionCoordinator, SessionEvent};
pub use router::{Audience, BroadcastRouter, MessageSink, Outbound};
