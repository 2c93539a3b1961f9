//! Message routing.
//!
//! Every inbound event is stamped with its sender's ID as `source`. Events
//! from a hub are fanned out to every other registered connection and the hub
//! receives a `broadcast-success` confirmation; events from a peer are never
//! relayed and the peer receives a `client-message-received` acknowledgement.

use std::sync::Arc;

use bridge_core::Event;
use tracing::{debug, info, warn};

use super::connection::ClientConnection;
use super::registry::ConnectionRegistry;

/// What the router did with one inbound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Hub event fanned out.
    Broadcast {
        /// Targets whose queue accepted the frame.
        delivered: usize,
        /// Targets whose writer had already gone away.
        failed: usize,
        /// `clientCount` reported back to the hub.
        client_count: usize,
    },
    /// Peer event acknowledged, not relayed.
    Acknowledged,
}

/// Routes decoded events according to the sender's role.
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    debug: bool,
}

impl MessageRouter {
    /// Create a router over `registry`. `debug` enables per-payload logging.
    pub fn new(registry: Arc<ConnectionRegistry>, debug: bool) -> Self {
        Self { registry, debug }
    }

    /// Route one event from `sender`.
    ///
    /// Delivery is best-effort: a target whose writer is gone is logged and
    /// skipped. Queueing to a slow target waits for capacity, so messages
    /// from one sender reach each target in order.
    pub async fn route(&self, sender: &ClientConnection, mut event: Event) -> RouteOutcome {
        self.log_inbound(sender, &event);
        event.stamp_source(&sender.id);

        if !sender.is_hub() {
            let _ = sender.send_event(&Event::client_message_received()).await;
            return RouteOutcome::Acknowledged;
        }

        let targets = self.registry.snapshot_excluding(&sender.id);
        let (delivered, failed) = match bridge_core::encode(&event) {
            Ok(json) => self.fan_out(&targets, &Arc::new(json)).await,
            Err(e) => {
                warn!(client_id = %sender.id, error = %e, "failed to encode event for broadcast");
                (0, targets.len())
            }
        };

        let client_count = self.registry.count().saturating_sub(1);
        let _ = sender
            .send_event(&Event::broadcast_success(client_count))
            .await;

        RouteOutcome::Broadcast {
            delivered,
            failed,
            client_count,
        }
    }

    async fn fan_out(&self, targets: &[Arc<ClientConnection>], json: &Arc<String>) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;
        for target in targets {
            if target.send(Arc::clone(json)).await {
                delivered += 1;
                if self.debug {
                    debug!(target_id = %target.id, "sent message");
                }
            } else {
                failed += 1;
                warn!(target_id = %target.id, "failed to send event to client");
            }
        }
        (delivered, failed)
    }

    fn log_inbound(&self, sender: &ClientConnection, event: &Event) {
        match event {
            Event::UnknownMessage { text, .. } => {
                info!(client_id = %sender.id, text = %text, "received plain text message");
            }
            _ if self.debug => {
                debug!(
                    client_id = %sender.id,
                    event_type = event.event_type().unwrap_or_default(),
                    payload = %event.to_value(),
                    "received message"
                );
            }
            _ => {
                info!(
                    client_id = %sender.id,
                    event_type = event.event_type().unwrap_or("JSON without type"),
                    "received message"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bridge_core::logging::capture_logs;
    use bridge_core::{ConnectionId, Role, decode_event};
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tracing::Level;

    use super::*;
    use crate::websocket::connection::Outbound;

    struct Harness {
        registry: Arc<ConnectionRegistry>,
        router: MessageRouter,
    }

    impl Harness {
        fn new(debug: bool) -> Self {
            let registry = Arc::new(ConnectionRegistry::new());
            let router = MessageRouter::new(Arc::clone(&registry), debug);
            Self { registry, router }
        }

        fn connect(&self, role: Role, seq: u64) -> (Arc<ClientConnection>, mpsc::Receiver<Outbound>) {
            let (tx, rx) = mpsc::channel(16);
            let conn = Arc::new(ClientConnection::new(ConnectionId::new(role, seq), tx));
            self.registry.register(Arc::clone(&conn)).unwrap();
            (conn, rx)
        }
    }

    fn next_json(rx: &mut mpsc::Receiver<Outbound>) -> Value {
        match rx.try_recv().expect("expected a queued message") {
            Outbound::Text(msg) => serde_json::from_str(&msg).unwrap(),
            Outbound::Ping => panic!("expected a text frame, got a ping"),
        }
    }

    #[tokio::test]
    async fn hub_event_reaches_every_peer() {
        let h = Harness::new(false);
        let (hub, mut hub_rx) = h.connect(Role::Hub, 1);
        let (_p1, mut rx1) = h.connect(Role::Peer, 2);
        let (_p2, mut rx2) = h.connect(Role::Peer, 3);

        let outcome = h.router.route(&hub, decode_event(br#"{"type":"ping","n":1}"#)).await;

        assert_eq!(
            outcome,
            RouteOutcome::Broadcast {
                delivered: 2,
                failed: 0,
                client_count: 2
            }
        );
        let expected = json!({"type": "ping", "n": 1, "source": "server-1"});
        assert_eq!(next_json(&mut rx1), expected);
        assert_eq!(next_json(&mut rx2), expected);

        let confirm = next_json(&mut hub_rx);
        assert_eq!(confirm["type"], "broadcast-success");
        assert_eq!(confirm["clientCount"], 2);
        assert!(confirm["timestamp"].is_i64());
        assert!(hub_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn hub_alone_reports_zero() {
        let h = Harness::new(false);
        let (hub, mut hub_rx) = h.connect(Role::Hub, 1);

        let outcome = h.router.route(&hub, decode_event(br#"{"type":"ping"}"#)).await;

        assert_matches!(outcome, RouteOutcome::Broadcast { delivered: 0, failed: 0, client_count: 0 });
        assert_eq!(next_json(&mut hub_rx)["clientCount"], 0);
    }

    #[tokio::test]
    async fn hub_plain_text_becomes_unknown_message() {
        let h = Harness::new(false);
        let (hub, _hub_rx) = h.connect(Role::Hub, 1);
        let (_peer, mut rx) = h.connect(Role::Peer, 2);

        let _ = h.router.route(&hub, decode_event(b"hello")).await;

        let msg = next_json(&mut rx);
        assert_eq!(msg["type"], "unknown-message");
        assert_eq!(msg["text"], "hello");
        assert_eq!(msg["source"], "server-1");
        assert!(msg["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn client_supplied_source_is_overwritten() {
        let h = Harness::new(false);
        let (hub, _hub_rx) = h.connect(Role::Hub, 1);
        let (_peer, mut rx) = h.connect(Role::Peer, 2);

        let _ = h
            .router
            .route(&hub, decode_event(br#"{"type":"x","source":"client-2"}"#))
            .await;

        assert_eq!(next_json(&mut rx)["source"], "server-1");
    }

    #[tokio::test]
    async fn peer_event_is_acknowledged_only() {
        let h = Harness::new(false);
        let (_hub, mut hub_rx) = h.connect(Role::Hub, 1);
        let (peer, mut peer_rx) = h.connect(Role::Peer, 2);
        let (_other, mut other_rx) = h.connect(Role::Peer, 3);

        let outcome = h.router.route(&peer, decode_event(br#"{"type":"chat"}"#)).await;

        assert_eq!(outcome, RouteOutcome::Acknowledged);
        let ack = next_json(&mut peer_rx);
        assert_eq!(ack["type"], "client-message-received");
        assert_eq!(
            ack["message"],
            "Message received (client-to-server messages are not relayed)"
        );
        assert!(peer_rx.try_recv().is_err());
        assert!(hub_rx.try_recv().is_err());
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn second_hub_receives_first_hubs_broadcast() {
        let h = Harness::new(false);
        let (hub1, _rx1) = h.connect(Role::Hub, 1);
        let (_hub2, mut rx2) = h.connect(Role::Hub, 2);

        let outcome = h.router.route(&hub1, decode_event(br#"{"type":"a"}"#)).await;

        assert_matches!(outcome, RouteOutcome::Broadcast { delivered: 1, client_count: 1, .. });
        assert_eq!(next_json(&mut rx2)["source"], "server-1");
    }

    #[tokio::test]
    async fn closed_target_is_skipped() {
        let h = Harness::new(false);
        let (hub, mut hub_rx) = h.connect(Role::Hub, 1);
        let (_gone, gone_rx) = h.connect(Role::Peer, 2);
        let (_live, mut live_rx) = h.connect(Role::Peer, 3);
        drop(gone_rx);

        let outcome = h.router.route(&hub, decode_event(br#"{"type":"ping"}"#)).await;

        assert_eq!(
            outcome,
            RouteOutcome::Broadcast {
                delivered: 1,
                failed: 1,
                client_count: 2
            }
        );
        assert_eq!(next_json(&mut live_rx)["type"], "ping");
        assert_eq!(next_json(&mut hub_rx)["type"], "broadcast-success");
    }

    #[tokio::test]
    async fn unregistered_peer_excluded_from_later_fan_out() {
        let h = Harness::new(false);
        let (hub, mut hub_rx) = h.connect(Role::Hub, 1);
        let (leaving, _leaving_rx) = h.connect(Role::Peer, 2);
        let (_staying, mut staying_rx) = h.connect(Role::Peer, 3);

        let _ = h.registry.unregister(&leaving.id);
        let outcome = h.router.route(&hub, decode_event(br#"{"type":"ping"}"#)).await;

        assert_matches!(outcome, RouteOutcome::Broadcast { delivered: 1, client_count: 1, .. });
        assert_eq!(next_json(&mut staying_rx)["type"], "ping");
        assert_eq!(next_json(&mut hub_rx)["clientCount"], 1);
    }

    #[tokio::test]
    async fn hub_messages_arrive_in_order() {
        let h = Harness::new(false);
        let (hub, _hub_rx) = h.connect(Role::Hub, 1);
        let (_peer, mut rx) = h.connect(Role::Peer, 2);

        for n in 0..5 {
            let payload = format!(r#"{{"type":"seq","n":{n}}}"#);
            let _ = h.router.route(&hub, decode_event(payload.as_bytes())).await;
        }
        for n in 0..5 {
            assert_eq!(next_json(&mut rx)["n"], n);
        }
    }

    #[tokio::test]
    async fn logs_type_only_without_debug() {
        let (logs, _guard) = capture_logs();
        let h = Harness::new(false);
        let (peer, _rx) = h.connect(Role::Peer, 1);

        let _ = h.router.route(&peer, decode_event(br#"{"type":"gift","secret":"x"}"#)).await;
        let _ = h.router.route(&peer, decode_event(br#"{"n":1}"#)).await;

        let typed = logs.find("received message").unwrap();
        assert_eq!(typed.level, Level::INFO);
        assert_eq!(typed.field("event_type"), Some("gift"));
        assert!(typed.field("payload").is_none());
        assert!(logs.events().iter().any(|e| e.field("event_type") == Some("JSON without type")));
        assert_eq!(logs.count_at_level(Level::DEBUG), 0);
    }

    #[tokio::test]
    async fn logs_payload_in_debug_mode() {
        let (logs, _guard) = capture_logs();
        let h = Harness::new(true);
        let (hub, _hub_rx) = h.connect(Role::Hub, 1);
        let (_peer, _rx) = h.connect(Role::Peer, 2);

        let _ = h.router.route(&hub, decode_event(br#"{"type":"gift","n":7}"#)).await;

        let received = logs.find("received message").unwrap();
        assert_eq!(received.level, Level::DEBUG);
        assert!(received.field("payload").unwrap().contains("\"n\":7"));
        assert!(logs.has_event(Level::DEBUG, "sent message"));
    }

    #[tokio::test]
    async fn logs_plain_text_at_info() {
        let (logs, _guard) = capture_logs();
        let h = Harness::new(true);
        let (peer, _rx) = h.connect(Role::Peer, 1);

        let _ = h.router.route(&peer, decode_event(b"just text")).await;

        let event = logs.find("plain text").unwrap();
        assert_eq!(event.level, Level::INFO);
        assert_eq!(event.field("text"), Some("just text"));
    }
}
