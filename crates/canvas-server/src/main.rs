//! Shared canvas server entry point.
//!
//! Accepts WebSocket connections from browsers and keeps every participant's
//! canvas in sync: segments, undo, clear, and live cursors.
//!
//! # Usage
//!
//! ```text
//! canvas-server [OPTIONS]
//!
//! Options:
//!   --config      <PATH>   Optional TOML config file
//!   --bind        <IP>     Bind address            [default: 0.0.0.0]
//!   --port        <PORT>   WebSocket listener port [default: 5000]
//!   --event-queue <N>      Coordinator queue size  [default: 1024]
//!   --log-level   <LEVEL>  Log level when RUST_LOG is unset [default: info]
//! ```
//!
//! # Precedence
//!
//! CLI flag (or its environment variable) > config file > built-in default.
//!
//! | Variable             | Flag            |
//! |----------------------|-----------------|
//! | `CANVAS_CONFIG`      | `--config`      |
//! | `CANVAS_BIND`        | `--bind`        |
//! | `CANVAS_PORT`        | `--port`        |
//! | `CANVAS_EVENT_QUEUE` | `--event-queue` |
//! | `CANVAS_LOG_LEVEL`   | `--log-level`   |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use canvas_server::domain::ServerConfig;
use canvas_server::infrastructure::run_server;
use canvas_server::infrastructure::storage::{load_config, FileConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Real-time shared canvas server.
///
/// Flags left unset fall back to the config file, then to built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "canvas-server",
    about = "Real-time shared canvas session server",
    version
)]
struct Cli {
    /// Path to an optional TOML config file.
    #[arg(long, env = "CANVAS_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the WebSocket server to.
    #[arg(long, env = "CANVAS_BIND")]
    bind: Option<IpAddr>,

    /// TCP port for the WebSocket server to listen on.
    #[arg(long, env = "CANVAS_PORT")]
    port: Option<u16>,

    /// Capacity of the coordinator's inbound event queue.
    #[arg(long, env = "CANVAS_EVENT_QUEUE")]
    event_queue: Option<usize>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "CANVAS_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Layers the CLI flags over the config file (or defaults).
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or is invalid, or
    /// if `--event-queue` is zero.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let file = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => FileConfig::default(),
        };
        let base = file
            .into_server_config()
            .context("invalid config file contents")?;

        let ip = self.bind.unwrap_or(base.bind_addr.ip());
        let port = self.port.unwrap_or(base.bind_addr.port());
        let event_queue_capacity = self.event_queue.unwrap_or(base.event_queue_capacity);
        anyhow::ensure!(
            event_queue_capacity > 0,
            "--event-queue must be greater than zero"
        );

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(ip, port),
            event_queue_capacity,
            log_level: self.log_level.unwrap_or(base.log_level),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_server_config()?;

    // `RUST_LOG` wins over the configured level when present.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("shared canvas server starting, bind={}", config.bind_addr);

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("shared canvas server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
