//! Connection roles and handshake negotiation.
//!
//! A client announces its role through the `Sec-WebSocket-Protocol` header:
//!
//! ```text
//! Sec-WebSocket-Protocol: laplace-event-bridge-role-server, <token>
//! ```
//!
//! The first comma-separated component is the role token, the second the
//! shared-secret credential. Clients that cannot set subprotocols may pass the
//! credential as a `?token=` query parameter instead.

use serde::{Deserialize, Serialize};

/// Subprotocol value that marks a connection as the hub.
pub const HUB_PROTOCOL: &str = "laplace-event-bridge-role-server";

/// Subprotocol value conventionally sent by peers. Any value other than
/// [`HUB_PROTOCOL`] (or none at all) means peer.
pub const PEER_PROTOCOL: &str = "laplace-event-bridge-role-client";

/// Role of a connection, fixed at handshake time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Privileged source whose events are broadcast to everyone else.
    Hub,
    /// Ordinary subscriber; its events are acknowledged, never relayed.
    Peer,
}

impl Role {
    /// Prefix used when rendering connection IDs.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Hub => "server",
            Self::Peer => "client",
        }
    }

    /// Whether this is the hub role.
    #[must_use]
    pub const fn is_hub(self) -> bool {
        matches!(self, Self::Hub)
    }
}

/// Values extracted from a connection request before upgrade.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Handshake {
    /// First subprotocol component, if any.
    pub role_token: Option<String>,
    /// Shared-secret credential from the subprotocol or the `token` query parameter.
    pub credential: Option<String>,
}

/// The presented credential did not match the configured secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthRejected {
    /// Role the rejected connection asked for.
    pub role: Role,
}

/// Extract role token and credential from the request.
///
/// `protocol_header` is the raw `Sec-WebSocket-Protocol` value; `query_token`
/// is the `token` query parameter. The header credential wins when both are
/// present. Empty components count as absent.
pub fn negotiate(protocol_header: Option<&str>, query_token: Option<&str>) -> Handshake {
    let mut parts = protocol_header
        .unwrap_or_default()
        .split(',')
        .map(str::trim);

    let role_token = parts.next().filter(|s| !s.is_empty()).map(str::to_owned);
    let credential = parts
        .next()
        .filter(|s| !s.is_empty())
        .or_else(|| query_token.filter(|s| !s.is_empty()))
        .map(str::to_owned);

    Handshake {
        role_token,
        credential,
    }
}

impl Handshake {
    /// Role implied by the role token.
    #[must_use]
    pub fn role(&self) -> Role {
        if self.role_token.as_deref() == Some(HUB_PROTOCOL) {
            Role::Hub
        } else {
            Role::Peer
        }
    }

    /// Check the credential against the configured secret.
    ///
    /// An empty secret disables authentication.
    pub fn authorize(&self, secret: &str) -> Result<(), AuthRejected> {
        if secret.is_empty() || self.credential.as_deref() == Some(secret) {
            Ok(())
        } else {
            Err(AuthRejected { role: self.role() })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
