//! TOML config file for the canvas server.
//!
//! The file is optional.  Every key has a default, so an empty file, a file
//! with only some keys, or no file at all are all valid:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 5000
//! event_queue_capacity = 1024
//! log_level = "info"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the file.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::config::{ServerConfig, DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_PORT};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error other than "not found".
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),

    /// `event_queue_capacity` must be at least 1.
    #[error("event_queue_capacity must be greater than zero")]
    ZeroQueueCapacity,
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level config file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
}

/// The `[server]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port for WebSocket connections.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Capacity of the coordinator's inbound event queue.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_event_queue_capacity() -> usize {
    DEFAULT_EVENT_QUEUE_CAPACITY
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            event_queue_capacity: default_event_queue_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl FileConfig {
    /// Validates the file contents and converts them into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `bind_address` is not an IP
    /// address, or [`ConfigError::ZeroQueueCapacity`] for a zero queue size.
    pub fn into_server_config(self) -> Result<ServerConfig, ConfigError> {
        let ip: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.server.bind_address.clone()))?;
        if self.server.event_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(ServerConfig {
            bind_addr: SocketAddr::new(ip, self.server.port),
            event_queue_capacity: self.server.event_queue_capacity,
            log_level: self.server.log_level,
        })
    }
}

/// Parses config file contents.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or a value has the
/// wrong type.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the config file at `path`, returning defaults if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
