//! Per-connection lifecycle: register, greet, receive until closed, unregister.
//!
//! Each upgraded socket is split into a reader (this task) and a writer task
//! that drains the connection's outbound queue, heartbeat pings included.
//! The welcome is queued before the connection is registered, so it is always
//! the first frame the client sees. The registry entry is removed by a drop guard, so it is gone before the
//! connection task completes no matter how the receive loop ends.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use bridge_core::{ConnectionId, Event, RegistryError, decode_event};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::connection::{ClientConnection, Outbound};
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use super::registry::ConnectionRegistry;
use super::router::MessageRouter;

/// How long the writer gets to flush its close frame before being aborted.
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Shared dependencies for connection tasks.
#[derive(Clone)]
pub struct ConnectionContext {
    /// Live connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Inbound event router.
    pub router: Arc<MessageRouter>,
    /// Ping interval.
    pub heartbeat_interval: Duration,
    /// Silence tolerated before the connection is dropped.
    pub heartbeat_timeout: Duration,
    /// Outbound queue depth.
    pub send_queue_capacity: usize,
}

/// Why a connection's receive loop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client sent a close frame, with its status code if any.
    Closed(Option<u16>),
    /// The stream ended without a close frame.
    StreamEnded,
    /// Reading from the socket failed.
    ReadError(String),
    /// No pong within the heartbeat timeout.
    HeartbeatTimeout,
    /// The server is shutting down.
    Shutdown,
}

impl DisconnectReason {
    /// Whether the disconnect should be logged as a warning.
    ///
    /// Normal (1000) and going-away (1001) closes, codeless closes, streams
    /// that simply end, and shutdown are expected.
    pub fn is_unexpected(&self) -> bool {
        match self {
            Self::Closed(Some(code)) => !matches!(code, 1000 | 1001),
            Self::Closed(None) | Self::StreamEnded | Self::Shutdown => false,
            Self::ReadError(_) | Self::HeartbeatTimeout => true,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(Some(code)) => write!(f, "closed by client ({code})"),
            Self::Closed(None) => f.write_str("closed by client"),
            Self::StreamEnded => f.write_str("connection dropped"),
            Self::ReadError(e) => write!(f, "read error: {e}"),
            Self::HeartbeatTimeout => f.write_str("heartbeat timeout"),
            Self::Shutdown => f.write_str("server shutdown"),
        }
    }
}

/// Greeting sent in the `established` event.
///
/// `mask_token` appends `?token=***` so the credential never echoes back.
pub fn welcome_message(host: &str, path: &str, mask_token: bool) -> String {
    let mut url = format!("ws://{host}{path}");
    if mask_token {
        url.push_str("?token=***");
    }
    format!("Connected to LAPLACE Event Bridge: {url}")
}

/// Removes the registry entry when dropped.
struct Registration {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let _ = self.registry.unregister(&self.id);
    }
}

/// Drive one upgraded connection until it closes.
///
/// Queues the welcome event, registers the connection under `id`, then routes
/// every text or binary frame until the client leaves, the heartbeat times
/// out, or `cancel` fires. Fails only if `id` is already registered.
pub async fn run_connection(
    socket: WebSocket,
    id: ConnectionId,
    welcome: String,
    ctx: ConnectionContext,
    cancel: CancellationToken,
) -> Result<DisconnectReason, RegistryError> {
    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::channel(ctx.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(id, tx));
    let _ = connection.send_event(&Event::established(&id, welcome)).await;

    ctx.registry.register(Arc::clone(&connection))?;
    let registration = Registration {
        registry: Arc::clone(&ctx.registry),
        id,
    };
    info!(client_id = %id, is_server = id.role().is_hub(), "client connected");

    let mut writer = tokio::spawn(write_loop(sink, rx, cancel.clone()));

    let heartbeat = run_heartbeat(
        Arc::clone(&connection),
        ctx.heartbeat_interval,
        ctx.heartbeat_timeout,
        cancel.clone(),
    );
    tokio::pin!(heartbeat);

    let reason = loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    connection.mark_alive();
                    let _ = ctx.router.route(&connection, decode_event(text.as_str().as_bytes())).await;
                }
                Some(Ok(Message::Binary(bytes))) => {
                    connection.mark_alive();
                    let _ = ctx.router.route(&connection, decode_event(&bytes)).await;
                }
                // axum answers pings itself
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => connection.mark_alive(),
                Some(Ok(Message::Close(frame))) => break DisconnectReason::Closed(frame.map(|f| f.code)),
                Some(Err(e)) => break DisconnectReason::ReadError(e.to_string()),
                None => break DisconnectReason::StreamEnded,
            },
            result = &mut heartbeat => break match result {
                HeartbeatResult::TimedOut => DisconnectReason::HeartbeatTimeout,
                HeartbeatResult::Cancelled => DisconnectReason::Shutdown,
            },
        }
    };

    cancel.cancel();
    drop(registration);
    log_disconnect(id, &reason, connection.failed_write_count());

    if time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }
    Ok(reason)
}

fn log_disconnect(id: ConnectionId, reason: &DisconnectReason, failed_writes: u64) {
    let is_server = id.role().is_hub();
    if reason.is_unexpected() {
        warn!(client_id = %id, is_server, failed_writes, reason = %reason, "client disconnected");
    } else {
        info!(client_id = %id, is_server, failed_writes, reason = %reason, "client disconnected");
    }
}

/// Forward queued frames to the socket.
///
/// Ends when the queue closes, a send fails, or `done` fires (sending a
/// close frame first).
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
    done: CancellationToken,
) {
    loop {
        tokio::select! {
            msg = rx.recv() => {
                let frame = match msg {
                    Some(Outbound::Text(text)) => Message::Text(text.as_str().into()),
                    Some(Outbound::Ping) => Message::Ping(Bytes::new()),
                    None => break,
                };
                if sink.send(frame).await.is_err() {
                    break;
                }
            }
            () = done.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
    let _ = sink.close().await;
}
