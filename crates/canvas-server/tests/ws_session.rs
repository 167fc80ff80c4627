//! End-to-end tests over real WebSocket connections.
//!
//! Each test binds a server on an ephemeral localhost port, connects one or
//! more `tokio-tungstenite` clients, and checks what every client receives.
//!
//! # Synchronising without sleeps
//!
//! The server applies messages in a single total order, so a test can prove
//! that an earlier message was processed by waiting for a later message's
//! visible effect.  For example, after A sends `draw-line` and then `clear`,
//! receiving `canvas-clear` on A proves the draw was handled, and proves A
//! was *not* sent its own `draw-line` (it would have arrived first).

use std::net::SocketAddr;
use std::sync::{atomic::AtomicBool, Arc};
use std::time::Duration;

use canvas_core::{ConnectionId, CursorUpdate, Point, Segment, ServerMessage};
use canvas_server::domain::ServerConfig;
use canvas_server::infrastructure::{bind, serve};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn start_server() -> SocketAddr {
    let listener = bind("127.0.0.1:0".parse().unwrap()).await.expect("bind");
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        bind_addr: addr,
        ..ServerConfig::default()
    };
    tokio::spawn(serve(listener, config, Arc::new(AtomicBool::new(true))));
    addr
}

/// Connects and consumes the `initial-history` unicast, returning it.
async fn join(addr: SocketAddr) -> (Client, Vec<Segment>) {
    let (mut ws, _) = connect_async(format!("ws://{addr}"))
        .await
        .expect("connect");
    match recv(&mut ws).await {
        ServerMessage::InitialHistory(history) => (ws, history),
        other => panic!("first message must be initial-history, got {other:?}"),
    }
}

async fn recv(ws: &mut Client) -> ServerMessage {
    loop {
        let frame = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed")
            .expect("WebSocket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).expect("server sent invalid JSON");
        }
    }
}

/// Next message that is not presence traffic.
async fn recv_canvas(ws: &mut Client) -> ServerMessage {
    loop {
        match recv(ws).await {
            ServerMessage::UsersUpdate(_) | ServerMessage::CursorUpdate(_) => continue,
            other => return other,
        }
    }
}

/// Next `users-update` with exactly `len` participants.
async fn recv_users(ws: &mut Client, len: usize) -> Vec<(ConnectionId, String)> {
    loop {
        if let ServerMessage::UsersUpdate(users) = recv(ws).await {
            if users.len() == len {
                return users.into_iter().map(|(id, u)| (id, u.color)).collect();
            }
        }
    }
}

async fn send(ws: &mut Client, value: Value) {
    ws.send(WsMessage::Text(value.to_string()))
        .await
        .expect("send");
}

fn segment(n: f64) -> Segment {
    Segment {
        start: Point::new(n, n),
        end: Point::new(n + 10.0, n + 10.0),
        color: "#000000".to_string(),
        size: 5.0,
    }
}

async fn draw(ws: &mut Client, seg: &Segment) {
    send(ws, json!({"type": "draw-line", "data": seg})).await;
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_draw_line_reaches_others_but_not_origin() {
    // Arrange
    let addr = start_server().await;
    let (mut a, history_a) = join(addr).await;
    let (mut b, history_b) = join(addr).await;
    assert!(history_a.is_empty());
    assert!(history_b.is_empty());

    // Act
    send(
        &mut a,
        json!({"type": "draw-line", "data": {
            "start": {"x": 0, "y": 0}, "end": {"x": 10, "y": 10}, "color": "#000000", "size": 5
        }}),
    )
    .await;

    // Assert: B gets the exact payload.
    assert_eq!(
        recv_canvas(&mut b).await,
        ServerMessage::DrawLine(Segment {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 10.0),
            color: "#000000".to_string(),
            size: 5.0,
        })
    );

    // A's next canvas message is its own clear, so no draw-line echo was queued.
    send(&mut a, json!({"type": "clear"})).await;
    assert_eq!(recv_canvas(&mut a).await, ServerMessage::CanvasClear);
}

#[tokio::test]
async fn test_undo_resends_history_to_everyone() {
    // Arrange: an observer confirms A's three segments were accepted.
    let addr = start_server().await;
    let (mut a, _) = join(addr).await;
    let (mut observer, _) = join(addr).await;
    let segments: Vec<Segment> = (1..=3).map(|n| segment(n as f64)).collect();
    for seg in &segments {
        draw(&mut a, seg).await;
    }
    for seg in &segments {
        assert_eq!(
            recv_canvas(&mut observer).await,
            ServerMessage::DrawLine(seg.clone())
        );
    }

    // B joins late and sees all three.
    let (mut b, history_b) = join(addr).await;
    assert_eq!(history_b, segments);

    // Act
    send(&mut a, json!({"type": "undo"})).await;

    // Assert
    for client in [&mut a, &mut b, &mut observer] {
        assert_eq!(recv_canvas(client).await, ServerMessage::CanvasClear);
        assert_eq!(
            recv_canvas(client).await,
            ServerMessage::InitialHistory(segments[..2].to_vec())
        );
    }
}

#[tokio::test]
async fn test_clear_then_late_joiner_gets_empty_history() {
    let addr = start_server().await;
    let (mut a, _) = join(addr).await;
    draw(&mut a, &segment(1.0)).await;
    draw(&mut a, &segment(2.0)).await;

    send(&mut a, json!({"type": "clear"})).await;
    assert_eq!(recv_canvas(&mut a).await, ServerMessage::CanvasClear);

    let (_c, history_c) = join(addr).await;
    assert!(history_c.is_empty());
}

#[tokio::test]
async fn test_undo_on_empty_canvas_sends_nothing() {
    let addr = start_server().await;
    let (mut a, _) = join(addr).await;

    send(&mut a, json!({"type": "undo"})).await;
    send(&mut a, json!({"type": "clear"})).await;

    // The undo produced nothing, so the first canvas message is the clear.
    assert_eq!(recv_canvas(&mut a).await, ServerMessage::CanvasClear);
}

#[tokio::test]
async fn test_cursor_move_is_relayed_with_origin_color() {
    // Arrange: A is alone, so the first users-update names only A.
    let addr = start_server().await;
    let (mut a, _) = join(addr).await;
    let (a_id, a_color) = recv_users(&mut a, 1).await.remove(0);
    let (mut b, _) = join(addr).await;

    // Act
    send(&mut a, json!({"type": "cursor-move", "data": {"x": 5, "y": 6.5}})).await;

    // Assert
    let update = loop {
        if let ServerMessage::CursorUpdate(update) = recv(&mut b).await {
            break update;
        }
    };
    assert_eq!(
        update,
        CursorUpdate {
            id: a_id,
            pos: Point::new(5.0, 6.5),
            color: a_color,
        }
    );
}

#[tokio::test]
async fn test_disconnect_broadcasts_updated_membership() {
    // Arrange
    let addr = start_server().await;
    let (mut a, _) = join(addr).await;
    let (a_id, _) = recv_users(&mut a, 1).await.remove(0);
    let (mut b, _) = join(addr).await;
    let both = recv_users(&mut a, 2).await;
    assert!(both.iter().any(|(id, _)| *id == a_id));

    // Act
    b.close(None).await.expect("close");

    // Assert
    let remaining = recv_users(&mut a, 1).await;
    assert_eq!(remaining[0].0, a_id);
}

#[tokio::test]
async fn test_invalid_payloads_are_dropped_and_connection_survives() {
    let addr = start_server().await;
    let (mut a, _) = join(addr).await;
    let (mut b, _) = join(addr).await;

    a.send(WsMessage::Text("definitely not json".to_string()))
        .await
        .unwrap();
    send(&mut a, json!({"type": "draw-line", "data": {"start": {"x": 0, "y": 0}}})).await;
    send(&mut a, json!({"type": "draw-line", "data": {
        "start": {"x": 0, "y": 0}, "end": {"x": 1, "y": 1}, "color": "#FFFFFF", "size": "wide"
    }}))
    .await;
    send(&mut a, json!({"type": "erase-everything"})).await;
    draw(&mut a, &segment(4.0)).await;

    // Only the valid segment is relayed.
    assert_eq!(
        recv_canvas(&mut b).await,
        ServerMessage::DrawLine(segment(4.0))
    );
    // And only the valid segment was logged.
    let (_c, history_c) = join(addr).await;
    assert_eq!(history_c, vec![segment(4.0)]);
}

#[tokio::test]
async fn test_segments_arrive_in_send_order() {
    let addr = start_server().await;
    let (mut a, _) = join(addr).await;
    let (mut b, _) = join(addr).await;
    let segments: Vec<Segment> = (0..25).map(|n| segment(n as f64)).collect();

    for seg in &segments {
        draw(&mut a, seg).await;
    }

    for seg in &segments {
        assert_eq!(recv_canvas(&mut b).await, ServerMessage::DrawLine(seg.clone()));
    }
}

#[tokio::test]
async fn test_client_close_receives_close_reply() {
    let addr = start_server().await;
    let (mut a, _) = join(addr).await;

    a.close(None).await.expect("close");

    // Presence updates may still be in flight; the close reply follows them.
    loop {
        let frame = timeout(RECV_TIMEOUT, a.next())
            .await
            .expect("timed out waiting for the close reply")
            .expect("stream ended without a close reply")
            .expect("connection dropped without completing the close handshake");
        match frame {
            WsMessage::Close(_) => break,
            WsMessage::Text(_) => continue,
            other => panic!("unexpected frame {other:?}"),
        }
    }
}
