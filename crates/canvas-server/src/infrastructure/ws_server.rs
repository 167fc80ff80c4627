//! WebSocket server: accept loop, coordinator task, and per-connection tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Spawning the single coordinator task that owns all session state.
//! 3. Accepting incoming TCP connections and upgrading each to a WebSocket.
//! 4. Running two tasks per connection:
//!    - **Reader**: WebSocket text frames → [`ClientMessage`] → coordinator.
//!    - **Writer**: outbound queue → JSON text frames → WebSocket.
//! 5. Gracefully stopping the accept loop when the `running` flag is cleared.
//!
//! # Task layout
//!
//! ```text
//!   conn A reader ─┐                              ┌─► conn A outbound ─► writer A
//!   conn B reader ─┼─► mpsc<SessionEvent> ─► coordinator ─┼─► conn B outbound ─► writer B
//!   conn C reader ─┘                              └─► conn C outbound ─► writer C
//! ```
//!
//! All readers share one bounded event queue.  When it is full, every
//! reader waits for the coordinator to catch up, so one flooding client
//! applies backpressure to all inbound traffic.  Outbound queues are
//! unbounded so the coordinator never waits on a slow browser.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use canvas_core::{decode_client_message, encode_server_message, ClientMessage, ConnectionId};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::{Outbound, SessionCoordinator, SessionEvent};
use crate::domain::config::ServerConfig;
use crate::infrastructure::connection_guard::ConnectionGuard;

/// How often the accept loop re-checks the `running` flag while idle.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long a closing connection's writer may take to flush its queue and
/// the close handshake before it is aborted.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the configured address and serves until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(config: ServerConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = bind(config.bind_addr).await?;
    serve(listener, config, running).await
}

/// Binds the WebSocket TCP listener.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))?;
    info!("canvas server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Runs the coordinator and the accept loop on an already-bound listener.
///
/// Split from [`run_server`] so tests can bind port 0 and learn the port
/// before serving.
///
/// # Errors
///
/// Currently always returns `Ok(())` once `running` is cleared; accept errors
/// are logged and the loop continues.
pub async fn serve(
    listener: TcpListener,
    config: ServerConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity.max(1));
    tokio::spawn(SessionCoordinator::new().run(events_rx));

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the loop can notice the `running` flag even when
        // no browsers are connecting.
        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let events = events_tx.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, events).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g., too many open file descriptors).
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    // The coordinator stops once the last connection task drops its sender.
    drop(events_tx);
    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// Entry point of each per-connection task; logs the outcome of [`run_connection`].
async fn handle_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    events: mpsc::Sender<SessionEvent>,
) {
    match run_connection(raw_stream, peer_addr, events).await {
        Ok(connection_id) => info!("connection {connection_id} ({peer_addr}) closed"),
        Err(e) => warn!("connection from {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one browser connection.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails or the coordinator has
/// already stopped.
async fn run_connection(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    events: mpsc::Sender<SessionEvent>,
) -> anyhow::Result<ConnectionId> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let connection_id = Uuid::new_v4();
    info!("connection {connection_id} established from {peer_addr}");

    let (ws_tx, ws_rx) = ws_stream.split();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<Outbound>();

    if events
        .send(SessionEvent::Connected {
            connection_id,
            sink: Box::new(out_tx),
        })
        .await
        .is_err()
    {
        anyhow::bail!("connection {connection_id}: coordinator is not running");
    }

    // From here on, leaving this function (by any path) announces the disconnect.
    let guard = ConnectionGuard::new(connection_id, events.clone());

    let mut writer_task = tokio::spawn(write_frames(ws_tx, out_rx, connection_id));
    let mut reader_task = tokio::spawn(read_frames(ws_rx, connection_id, events));

    tokio::select! {
        _ = &mut reader_task => {
            debug!("connection {connection_id}: reader ended");
            // Unregistering closes the outbound queue; the writer then drains
            // it and closes the sink, which flushes the close reply.
            drop(guard);
            if timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task).await.is_err() {
                debug!("connection {connection_id}: writer did not drain in time");
                writer_task.abort();
            }
        }
        _ = &mut writer_task => {
            debug!("connection {connection_id}: writer ended");
            reader_task.abort();
        }
    }

    Ok(connection_id)
}

/// Forwards browser frames to the coordinator until the browser goes away.
///
/// Invalid frames are logged and skipped; they never end the connection.
async fn read_frames<S>(
    mut frames: S,
    connection_id: ConnectionId,
    events: mpsc::Sender<SessionEvent>,
) where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    loop {
        let frame = match frames.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                debug!("connection {connection_id}: WebSocket closed");
                break;
            }
            Some(Err(e)) => {
                warn!("connection {connection_id}: WebSocket error: {e}");
                break;
            }
            None => {
                debug!("connection {connection_id}: stream ended");
                break;
            }
        };

        match frame {
            WsMessage::Text(text) => {
                let message: ClientMessage = match decode_client_message(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("connection {connection_id}: {e}");
                        continue;
                    }
                };
                if events
                    .send(SessionEvent::Inbound {
                        connection_id,
                        message,
                    })
                    .await
                    .is_err()
                {
                    debug!("connection {connection_id}: coordinator stopped");
                    break;
                }
            }
            WsMessage::Binary(_) => {
                warn!("connection {connection_id}: unexpected binary frame (ignored)");
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => {
                // tokio-tungstenite answers pings on the next write/flush.
            }
            WsMessage::Close(_) => {
                debug!("connection {connection_id}: Close frame received");
                break;
            }
            WsMessage::Frame(_) => {}
        }
    }
}

/// Drains the connection's outbound queue into the WebSocket.
///
/// Ends when the coordinator drops the queue (connection unregistered) or
/// when the browser can no longer be written to.  Either way the sink is
/// closed last, completing the close handshake if the browser started one.
async fn write_frames<S>(
    mut sink: S,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    connection_id: ConnectionId,
) where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Some(message) = outbound.recv().await {
        let text = match encode_server_message(&message) {
            Ok(text) => text,
            Err(e) => {
                error!("connection {connection_id}: {e}");
                continue;
            }
        };
        if let Err(e) = sink.send(WsMessage::Text(text)).await {
            debug!("connection {connection_id}: send failed (browser disconnected): {e}");
            break;
        }
    }

    if let Err(e) = sink.close().await {
        debug!("connection {connection_id}: close: {e}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use canvas_core::{Point, ServerMessage};
    use futures_util::stream;

    fn text(json: &str) -> Result<WsMessage, WsError> {
        Ok(WsMessage::Text(json.to_string()))
    }

    async fn collect_events(rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_read_frames_forwards_valid_messages_in_order() {
        // Arrange
        let (tx, mut rx) = mpsc::channel(16);
        let id = Uuid::new_v4();
        let frames = stream::iter(vec![
            text(r#"{"type":"cursor-move","data":{"x":1,"y":2}}"#),
            text(r#"{"type":"undo"}"#),
        ]);

        // Act
        read_frames(frames, id, tx).await;

        // Assert
        let events = collect_events(&mut rx).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            SessionEvent::Inbound { connection_id, message: ClientMessage::CursorMove(p) }
                if *connection_id == id && *p == Point::new(1.0, 2.0)
        ));
        assert!(matches!(
            &events[1],
            SessionEvent::Inbound { message: ClientMessage::Undo, .. }
        ));
    }

    #[tokio::test]
    async fn test_read_frames_skips_invalid_payloads() {
        let (tx, mut rx) = mpsc::channel(16);
        let frames = stream::iter(vec![
            text("{not json"),
            text(r#"{"type":"draw-line","data":{"size":"huge"}}"#),
            text(r#"{"type":"teleport"}"#),
            Ok(WsMessage::Binary(vec![1, 2, 3])),
            text(r#"{"type":"clear"}"#),
        ]);

        read_frames(frames, Uuid::new_v4(), tx).await;

        let events = collect_events(&mut rx).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            SessionEvent::Inbound { message: ClientMessage::Clear, .. }
        ));
    }

    #[tokio::test]
    async fn test_read_frames_stops_at_close_frame() {
        let (tx, mut rx) = mpsc::channel(16);
        let frames = stream::iter(vec![
            Ok(WsMessage::Close(None)),
            text(r#"{"type":"clear"}"#),
        ]);

        read_frames(frames, Uuid::new_v4(), tx).await;

        assert!(collect_events(&mut rx).await.is_empty());
    }

    /// Records frames and whether the sink was closed.
    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<WsMessage>,
        closed: bool,
    }

    impl Sink<WsMessage> for RecordingSink {
        type Error = WsError;

        fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(mut self: Pin<&mut Self>, item: WsMessage) -> Result<(), WsError> {
            if self.closed {
                return Err(WsError::AlreadyClosed);
            }
            self.frames.push(item);
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            self.closed = true;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_write_frames_encodes_json_text() {
        // Arrange
        let mut sink = RecordingSink::default();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        out_tx.send(Arc::new(ServerMessage::CanvasClear)).unwrap();
        out_tx
            .send(Arc::new(ServerMessage::InitialHistory(Vec::new())))
            .unwrap();
        drop(out_tx);

        // Act
        write_frames(&mut sink, out_rx, Uuid::new_v4()).await;

        // Assert
        assert_eq!(
            sink.frames,
            vec![
                WsMessage::Text(r#"{"type":"canvas-clear"}"#.to_string()),
                WsMessage::Text(r#"{"type":"initial-history","data":[]}"#.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_write_frames_closes_sink_after_queue_ends() {
        let mut sink = RecordingSink::default();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<Outbound>();
        drop(out_tx);

        write_frames(&mut sink, out_rx, Uuid::new_v4()).await;

        assert!(sink.frames.is_empty());
        assert!(sink.closed);
    }
}
