//! Scoped disconnect notification.
//!
//! A [`ConnectionGuard`] is created right after a connection has been
//! announced to the coordinator and lives on the stack of that connection's
//! session task.  However the session ends (clean close, socket error,
//! panic unwinding, or the task being aborted), dropping the guard queues
//! exactly one [`SessionEvent::Disconnected`] for the connection.
//!
//! Because the guard is dropped only after the session's reader has stopped
//! queueing inbound messages, the disconnect is always ordered after that
//! connection's last message.

use canvas_core::ConnectionId;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::application::SessionEvent;

/// Emits `SessionEvent::Disconnected` for one connection when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    connection_id: ConnectionId,
    events: mpsc::Sender<SessionEvent>,
}

impl ConnectionGuard {
    pub fn new(connection_id: ConnectionId, events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            connection_id,
            events,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let event = SessionEvent::Disconnected {
            connection_id: self.connection_id,
        };
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                // `Drop` cannot await, so hand the send to the runtime.
                let events = self.events.clone();
                match Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            let _ = events.send(event).await;
                        });
                    }
                    Err(_) => warn!(
                        "connection {}: event queue full outside the runtime; disconnect lost",
                        self.connection_id
                    ),
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    "connection {}: coordinator already stopped",
                    self.connection_id
                );
            }
        }
    }
}
