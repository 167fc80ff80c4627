//! Infrastructure layer for canvas-server.
//!
//! The infrastructure layer handles all I/O: accepting WebSocket connections
//! from browsers, moving frames between sockets and the coordinator, and
//! reading the config file.
//!
//! # Responsibilities
//!
//! - Binding a TCP listener for browser WebSocket connections
//! - Performing the WebSocket HTTP upgrade handshake
//! - Spawning the coordinator task and per-connection reader/writer tasks
//! - Guaranteeing exactly one disconnect event per connection
//! - Loading the optional TOML config file
//!
//! # What does NOT belong here?
//!
//! - Deciding who receives a message (that is the application layer)
//! - Message type definitions (that is `canvas-core`)

pub mod connection_guard;
pub mod storage;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use ws_server::{bind, run_server, serve};
