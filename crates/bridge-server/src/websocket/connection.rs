//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bridge_core::{ConnectionId, Event, Role};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// A frame waiting in a connection's outbound queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Encoded event, sent as a text frame.
    Text(Arc<String>),
    /// Heartbeat ping.
    Ping,
}

/// A registered WebSocket connection.
///
/// Outbound frames go through a bounded channel drained by the connection's
/// single writer task, so writes to one socket never interleave.
pub struct ClientConnection {
    /// Connection ID, fixed at handshake.
    pub id: ConnectionId,
    /// Send channel to the client's WebSocket write task.
    tx: mpsc::Sender<Outbound>,
    /// Whether the client has shown activity since the last heartbeat check.
    pub is_alive: AtomicBool,
    /// Count of frames that could not be queued because the writer is gone.
    failed_writes: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            tx,
            is_alive: AtomicBool::new(true),
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Role the connection was classified as.
    pub fn role(&self) -> Role {
        self.id.role()
    }

    /// Whether this connection is a hub.
    pub fn is_hub(&self) -> bool {
        self.id.role().is_hub()
    }

    /// Queue a text frame for the client.
    ///
    /// Waits for queue capacity when the client is slow. Returns `false` and
    /// increments the failed-write counter if the writer has shut down.
    pub async fn send(&self, message: Arc<String>) -> bool {
        if self.tx.send(Outbound::Text(message)).await.is_ok() {
            true
        } else {
            self.record_failure();
            false
        }
    }

    /// Encode an event and queue it for the client.
    pub async fn send_event(&self, event: &Event) -> bool {
        match bridge_core::encode(event) {
            Ok(json) => self.send(Arc::new(json)).await,
            Err(e) => {
                warn!(client_id = %self.id, error = %e, "failed to encode event");
                false
            }
        }
    }

    /// Queue a ping without waiting.
    ///
    /// A full queue skips this ping; the client is already behind and the
    /// next heartbeat tick will count the missing pong.
    pub fn ping(&self) -> bool {
        match self.tx.try_send(Outbound::Ping) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Closed(_)) => {
                self.record_failure();
                false
            }
        }
    }

    fn record_failure(&self) {
        let _ = self.failed_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Frames that could not be delivered to the writer.
    pub fn failed_write_count(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or other frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("failed_writes", &self.failed_write_count())
            .finish_non_exhaustive()
    }
}
