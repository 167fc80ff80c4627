//! BroadcastRouter: delivers one outbound message to a chosen audience.
//!
//! # Audiences
//!
//! | Selector              | Receivers                                 |
//! |-----------------------|-------------------------------------------|
//! | [`Audience::All`]     | every registered connection               |
//! | [`Audience::AllExcept`] | every registered connection but one     |
//! | [`Audience::Only`]    | exactly one connection                    |
//!
//! # Delivery model
//!
//! Each connection is represented by a [`MessageSink`], in production the
//! sending half of that connection's unbounded outbound queue.  Delivering
//! is a non-blocking push, so a slow browser never stalls the coordinator.
//! Because each queue is FIFO and the coordinator calls the router one
//! message at a time, every connection sees messages in invocation order.
//!
//! A sink whose connection has already gone away rejects the push.  That is
//! a delivery miss: it is logged at `debug`, never retried, and never
//! reported as an error.  The departed connection is unregistered when its
//! disconnect event reaches the coordinator.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use canvas_core::{ConnectionId, ServerMessage};
use tokio::sync::mpsc;
use tracing::debug;

/// A message queued for one connection.
///
/// Shared behind an `Arc` so a broadcast to N connections allocates the
/// message once.
pub type Outbound = Arc<ServerMessage>;

/// Broadcast targeting rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every registered connection.
    All,
    /// Every registered connection except the given origin.
    AllExcept(ConnectionId),
    /// Only the given connection.
    Only(ConnectionId),
}

impl Audience {
    /// Returns `true` if `connection_id` belongs to this audience.
    pub fn includes(&self, connection_id: ConnectionId) -> bool {
        match self {
            Audience::All => true,
            Audience::AllExcept(origin) => *origin != connection_id,
            Audience::Only(target) => *target == connection_id,
        }
    }
}

/// Per-connection delivery endpoint.
///
/// Infrastructure implements this with a tokio channel; tests substitute a
/// mock to observe deliveries or to simulate a departed connection.
#[cfg_attr(test, mockall::automock)]
pub trait MessageSink: Send {
    /// Pushes `message` without blocking.
    ///
    /// Returns `false` if the connection is gone and the message was dropped.
    fn deliver(&self, message: Outbound) -> bool;
}

impl MessageSink for mpsc::UnboundedSender<Outbound> {
    fn deliver(&self, message: Outbound) -> bool {
        self.send(message).is_ok()
    }
}

/// Registry of connection sinks plus audience-based fan-out.
#[derive(Default)]
pub struct BroadcastRouter {
    sinks: HashMap<ConnectionId, Box<dyn MessageSink>>,
}

impl BroadcastRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the sink for `connection_id`.
    pub fn register(&mut self, connection_id: ConnectionId, sink: Box<dyn MessageSink>) {
        self.sinks.insert(connection_id, sink);
    }

    /// Removes the sink for `connection_id`.  Returns `false` if it was not registered.
    pub fn unregister(&mut self, connection_id: ConnectionId) -> bool {
        self.sinks.remove(&connection_id).is_some()
    }

    pub fn is_registered(&self, connection_id: ConnectionId) -> bool {
        self.sinks.contains_key(&connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.sinks.len()
    }

    /// Delivers `message` to every connection in `audience`, each exactly once.
    ///
    /// Returns the number of successful deliveries.  Misses are not errors.
    pub fn send(&self, audience: Audience, message: ServerMessage) -> usize {
        let kind = message.kind();
        let message: Outbound = Arc::new(message);

        // `Only` needs no scan of the whole map.
        if let Audience::Only(target) = audience {
            return match self.sinks.get(&target) {
                Some(sink) => usize::from(Self::deliver_one(target, &**sink, &message, kind)),
                None => {
                    debug!("{kind} for {target} dropped: connection not registered");
                    0
                }
            };
        }

        let mut delivered = 0;
        for (id, sink) in &self.sinks {
            if audience.includes(*id) && Self::deliver_one(*id, &**sink, &message, kind) {
                delivered += 1;
            }
        }
        delivered
    }

    fn deliver_one(
        connection_id: ConnectionId,
        sink: &dyn MessageSink,
        message: &Outbound,
        kind: &str,
    ) -> bool {
        let delivered = sink.deliver(Arc::clone(message));
        if !delivered {
            debug!("{kind} for {connection_id} missed: connection already closed");
        }
        delivered
    }
}

impl fmt::Debug for BroadcastRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastRouter")
            .field("connections", &self.sinks.keys().collect::<Vec<_>>())
            .finish()
    }
}
