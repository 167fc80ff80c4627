//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup from CLI arguments layered over an optional
//! config file (see `infrastructure::storage::config`), or from defaults in
//! tests.  Keeping it a plain struct with no environment reads makes the
//! server easy to embed in tests.

use std::net::SocketAddr;

/// Default listening port, matching the port browsers have always used.
pub const DEFAULT_PORT: u16 = 5000;

/// Default capacity of the coordinator's inbound event queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;

/// All runtime configuration for the canvas server.
///
/// # Example
///
/// ```rust
/// use canvas_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 5000);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address and port the WebSocket server binds to.
    pub bind_addr: SocketAddr,

    /// How many inbound events may wait for the coordinator before connection
    /// readers start waiting.  The queue is shared, so once it is full every
    /// connection's reader waits; outbound delivery never blocks on it.
    pub event_queue_capacity: usize,

    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ServerConfig {
    /// | Field                | Default          |
    /// |----------------------|------------------|
    /// | bind_addr            | `0.0.0.0:5000`   |
    /// | event_queue_capacity | 1024             |
    /// | log_level            | `info`           |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            log_level: "info".to_string(),
        }
    }
}
