//! Wire events.
//!
//! Every frame on the wire is a JSON object with a `type` discriminator. The
//! kinds the bridge itself produces are modelled as typed variants; anything a
//! hub sends is kept as an [`Event::Open`] map so unknown fields survive the
//! trip to peers untouched.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::ids::ConnectionId;

/// Acknowledgement text sent back to peers.
pub const CLIENT_ACK_MESSAGE: &str = "Message received (client-to-server messages are not relayed)";

/// `type` of the welcome event.
pub const ESTABLISHED: &str = "established";
/// `type` of the hub's fan-out confirmation.
pub const BROADCAST_SUCCESS: &str = "broadcast-success";
/// `type` of the peer acknowledgement.
pub const CLIENT_MESSAGE_RECEIVED: &str = "client-message-received";
/// `type` synthesized for payloads that are not JSON objects.
pub const UNKNOWN_MESSAGE: &str = "unknown-message";

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A structured bridge event.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Sent once to every new connection.
    Established {
        /// Assigned connection ID.
        client_id: String,
        /// Whether the connection was classified as the hub.
        is_server: bool,
        /// Human-readable greeting including the connect URL.
        message: String,
        /// Server version.
        version: String,
    },
    /// Sent to the hub after each fan-out.
    BroadcastSuccess {
        /// Number of connections other than the hub at confirmation time.
        client_count: usize,
        /// Milliseconds since epoch.
        timestamp: i64,
    },
    /// Sent to a peer for each message it sends.
    ClientMessageReceived {
        /// Explanation that peer messages are not relayed.
        message: String,
        /// Milliseconds since epoch.
        timestamp: i64,
    },
    /// Fallback for inbound payloads that did not decode as a JSON object.
    UnknownMessage {
        /// Raw payload as text.
        text: String,
        /// Sender ID, set once routed.
        source: Option<String>,
        /// Milliseconds since epoch.
        timestamp: i64,
    },
    /// Arbitrary structured event, forwarded as-is.
    Open(Map<String, Value>),
}

impl Event {
    /// Welcome event for a freshly registered connection.
    pub fn established(client_id: &ConnectionId, message: impl Into<String>) -> Self {
        Self::Established {
            client_id: client_id.to_string(),
            is_server: client_id.role().is_hub(),
            message: message.into(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Fan-out confirmation stamped with the current time.
    pub fn broadcast_success(client_count: usize) -> Self {
        Self::BroadcastSuccess {
            client_count,
            timestamp: now_millis(),
        }
    }

    /// Peer acknowledgement stamped with the current time.
    pub fn client_message_received() -> Self {
        Self::ClientMessageReceived {
            message: CLIENT_ACK_MESSAGE.to_owned(),
            timestamp: now_millis(),
        }
    }

    /// Fallback event for an undecodable payload, stamped with the current time.
    pub fn unknown_message(text: impl Into<String>) -> Self {
        Self::UnknownMessage {
            text: text.into(),
            source: None,
            timestamp: now_millis(),
        }
    }

    /// The `type` discriminator, if the event has one.
    ///
    /// Open events sent without a string `type` return `None`.
    pub fn event_type(&self) -> Option<&str> {
        match self {
            Self::Established { .. } => Some(ESTABLISHED),
            Self::BroadcastSuccess { .. } => Some(BROADCAST_SUCCESS),
            Self::ClientMessageReceived { .. } => Some(CLIENT_MESSAGE_RECEIVED),
            Self::UnknownMessage { .. } => Some(UNKNOWN_MESSAGE),
            Self::Open(map) => map.get("type").and_then(Value::as_str),
        }
    }

    /// Record the sender's ID as `source`, replacing any existing value.
    ///
    /// Server-originated kinds carry no provenance and are left unchanged.
    pub fn stamp_source(&mut self, sender: &ConnectionId) {
        match self {
            Self::UnknownMessage { source, .. } => *source = Some(sender.to_string()),
            Self::Open(map) => {
                let _ = map.insert("source".to_owned(), Value::String(sender.to_string()));
            }
            Self::Established { .. }
            | Self::BroadcastSuccess { .. }
            | Self::ClientMessageReceived { .. } => {}
        }
    }

    /// The `source` field, if stamped.
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::UnknownMessage { source, .. } => source.as_deref(),
            Self::Open(map) => map.get("source").and_then(Value::as_str),
            Self::Established { .. }
            | Self::BroadcastSuccess { .. }
            | Self::ClientMessageReceived { .. } => None,
        }
    }

    /// Wire representation as a JSON object.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Established {
                client_id,
                is_server,
                message,
                version,
            } => json!({
                "type": ESTABLISHED,
                "clientId": client_id,
                "isServer": is_server,
                "message": message,
                "version": version,
            }),
            Self::BroadcastSuccess {
                client_count,
                timestamp,
            } => json!({
                "type": BROADCAST_SUCCESS,
                "clientCount": client_count,
                "timestamp": timestamp,
            }),
            Self::ClientMessageReceived { message, timestamp } => json!({
                "type": CLIENT_MESSAGE_RECEIVED,
                "message": message,
                "timestamp": timestamp,
            }),
            Self::UnknownMessage {
                text,
                source,
                timestamp,
            } => {
                let mut value = json!({
                    "type": UNKNOWN_MESSAGE,
                    "text": text,
                    "timestamp": timestamp,
                });
                if let Some(source) = source {
                    value["source"] = Value::String(source.clone());
                }
                value
            }
            Self::Open(map) => Value::Object(map.clone()),
        }
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Avoid cloning the forwarded map on the hot path.
            Self::Open(map) => map.serialize(serializer),
            _ => self.to_value().serialize(serializer),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
