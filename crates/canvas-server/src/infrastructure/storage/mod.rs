//! Storage infrastructure: loading the optional TOML config file.
//!
//! The canvas itself is never stored; session state lives only in memory
//! for the lifetime of the process.

pub mod config;

pub use config::{load_config, ConfigError, FileConfig};
