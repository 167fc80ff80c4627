//! Domain layer for canvas-server.
//!
//! Plain configuration types with no dependencies on I/O or the async
//! runtime.  The drawing-session domain (log, presence, messages) lives in
//! `canvas-core` and is shared with anything else that speaks the protocol.

pub mod config;

pub use config::ServerConfig;
