//! SessionCoordinator: the single owner of the canvas session state.
//!
//! The coordinator owns the [`SessionLog`], the [`PresenceRegistry`], and the
//! [`BroadcastRouter`].  Nothing else mutates them.  Every connection's
//! traffic is funnelled into one queue of [`SessionEvent`]s, and
//! [`SessionCoordinator::run`] applies them one at a time.
//!
//! # Why this needs no locks (for beginners)
//!
//! [`SessionCoordinator::handle`] is a plain synchronous method: it cannot
//! `.await`, so it can never pause half-way through a mutation and let
//! another event observe partial state.  Events are applied strictly in
//! queue arrival order, which *is* the session's total order.
//!
//! # Message handling
//!
//! | Event                   | State change               | Broadcast                                   |
//! |-------------------------|----------------------------|---------------------------------------------|
//! | connected               | presence join              | Only(new): initial-history; All: users-update |
//! | `draw-line(seg)`        | log append                 | AllExcept(origin): draw-line                |
//! | `undo`                  | log undo_last              | All: canvas-clear, then All: initial-history (only if something was removed) |
//! | `clear`                 | log clear                  | All: canvas-clear                           |
//! | `cursor-move(p)`        | presence update_position   | AllExcept(origin): cursor-update            |
//! | disconnected            | presence leave             | All: users-update                           |
//!
//! Messages from a connection that is not (or no longer) registered are
//! ignored: they are stragglers from a disconnect race, not errors.

use std::fmt;

use canvas_core::{
    ClientMessage, ConnectionId, CursorUpdate, Point, PresenceRegistry, Segment, ServerMessage,
    SessionLog,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::application::router::{Audience, BroadcastRouter, MessageSink};

/// One unit of work for the coordinator.
pub enum SessionEvent {
    /// A WebSocket handshake completed.  `sink` is the connection's outbound queue.
    Connected {
        connection_id: ConnectionId,
        sink: Box<dyn MessageSink>,
    },
    /// A well-formed message arrived from `connection_id`.
    Inbound {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    /// The connection closed, for whatever reason.
    Disconnected { connection_id: ConnectionId },
}

impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Connected { connection_id, .. } => f
                .debug_struct("Connected")
                .field("connection_id", connection_id)
                .finish_non_exhaustive(),
            SessionEvent::Inbound {
                connection_id,
                message,
            } => f
                .debug_struct("Inbound")
                .field("connection_id", connection_id)
                .field("message", message)
                .finish(),
            SessionEvent::Disconnected { connection_id } => f
                .debug_struct("Disconnected")
                .field("connection_id", connection_id)
                .finish(),
        }
    }
}

/// Orchestrates the log, the registry, and the router.
#[derive(Debug)]
pub struct SessionCoordinator {
    log: SessionLog,
    presence: PresenceRegistry,
    router: BroadcastRouter,
}

impl SessionCoordinator {
    /// Creates a coordinator with an empty log and no connections.
    pub fn new() -> Self {
        Self::with_presence(PresenceRegistry::new())
    }

    /// Creates a coordinator around a caller-supplied registry (e.g. a seeded one).
    pub fn with_presence(presence: PresenceRegistry) -> Self {
        Self {
            log: SessionLog::new(),
            presence,
            router: BroadcastRouter::new(),
        }
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn router(&self) -> &BroadcastRouter {
        &self.router
    }

    /// Applies events until every sender of `events` has been dropped.
    ///
    /// Returns the coordinator so its final state can be inspected.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) -> Self {
        info!("session coordinator started");
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        info!(
            "session coordinator stopped: {} segment(s) in log, {} connection(s) registered",
            self.log.len(),
            self.presence.len()
        );
        self
    }

    /// Applies a single event as one indivisible step.
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected {
                connection_id,
                sink,
            } => self.on_connected(connection_id, sink),
            SessionEvent::Inbound {
                connection_id,
                message,
            } => self.on_message(connection_id, message),
            SessionEvent::Disconnected { connection_id } => self.on_disconnected(connection_id),
        }
    }

    fn on_connected(&mut self, connection_id: ConnectionId, sink: Box<dyn MessageSink>) {
        let entry = self.presence.join(connection_id);
        self.router.register(connection_id, sink);
        info!(
            "connection {connection_id} joined with color {} ({} online)",
            entry.color,
            self.presence.len()
        );

        self.router.send(
            Audience::Only(connection_id),
            ServerMessage::InitialHistory(self.log.snapshot()),
        );
        self.broadcast_users();
    }

    fn on_message(&mut self, origin: ConnectionId, message: ClientMessage) {
        if !self.presence.contains(origin) {
            debug!(
                "{} from unknown connection {origin} ignored",
                message.kind()
            );
            return;
        }

        debug!("connection {origin}: {}", message.kind());
        match message {
            ClientMessage::DrawLine(segment) => self.on_draw_line(origin, segment),
            ClientMessage::Undo => self.on_undo(origin),
            ClientMessage::Clear => self.on_clear(origin),
            ClientMessage::CursorMove(point) => self.on_cursor_move(origin, point),
        }
    }

    fn on_draw_line(&mut self, origin: ConnectionId, segment: Segment) {
        self.log.append(segment.clone());
        self.router
            .send(Audience::AllExcept(origin), ServerMessage::DrawLine(segment));
    }

    fn on_undo(&mut self, origin: ConnectionId) {
        if self.log.undo_last().is_none() {
            debug!("undo from {origin} on empty log: nothing to do");
            return;
        }
        // Browsers cannot erase one stroke from a raster surface, so undo is
        // sent as "blank, then replay everything that is left".
        self.router.send(Audience::All, ServerMessage::CanvasClear);
        self.router.send(
            Audience::All,
            ServerMessage::InitialHistory(self.log.snapshot()),
        );
    }

    fn on_clear(&mut self, origin: ConnectionId) {
        let removed = self.log.len();
        self.log.clear();
        info!("connection {origin} cleared the canvas ({removed} segment(s) removed)");
        self.router.send(Audience::All, ServerMessage::CanvasClear);
    }

    fn on_cursor_move(&mut self, origin: ConnectionId, point: Point) {
        let update = match self.presence.update_position(origin, point) {
            Ok(entry) => CursorUpdate {
                id: origin,
                pos: entry.position,
                color: entry.color.clone(),
            },
            Err(e) => {
                debug!("cursor-move ignored: {e}");
                return;
            }
        };
        self.router
            .send(Audience::AllExcept(origin), ServerMessage::CursorUpdate(update));
    }

    fn on_disconnected(&mut self, connection_id: ConnectionId) {
        self.router.unregister(connection_id);
        if self.presence.leave(connection_id).is_none() {
            debug!("disconnect for unknown connection {connection_id} ignored");
            return;
        }
        info!(
            "connection {connection_id} left ({} online)",
            self.presence.len()
        );
        self.broadcast_users();
    }

    fn broadcast_users(&self) {
        self.router.send(
            Audience::All,
            ServerMessage::users_update(&self.presence.snapshot()),
        );
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
