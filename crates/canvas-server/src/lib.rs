//! canvas-server library crate.
//!
//! This crate runs the session synchronization engine for a shared drawing
//! canvas: every segment any participant draws reaches every other
//! participant in the same order, including participants who join late.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (JSON over WebSocket)
//!         ↕
//! [canvas-server]
//!   ├── domain/           ServerConfig
//!   ├── application/
//!   │     ├── router/      BroadcastRouter: audience selection and fan-out
//!   │     └── coordinator/ SessionCoordinator: owns the log and presence
//!   └── infrastructure/
//!         ├── ws_server/  WebSocket accept loop and per-connection tasks
//!         └── storage/    TOML config file
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `canvas-core`; it never touches a
//!   socket, only the [`application::MessageSink`] seam.
//! - `infrastructure` depends on all other layers plus `tokio` and `tungstenite`.

/// Domain layer: runtime configuration (no I/O).
pub mod domain;

/// Application layer: broadcast routing and session coordination.
pub mod application;

/// Infrastructure layer: WebSocket server and config file loading.
pub mod infrastructure;
