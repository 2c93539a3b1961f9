//! Error types for the bridge core.
//!
//! Decode failures are not errors here: malformed inbound payloads degrade to
//! [`crate::codec::DecodeFailure`] and are recovered by the caller.

use thiserror::Error;

use crate::ids::ConnectionId;

/// Failure to serialize an outbound event.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON serialization failed.
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Connection registry invariant violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A connection with this ID is already registered.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::Role;

    #[test]
    fn already_registered_display() {
        let id = ConnectionId::new(Role::Peer, 7);
        let err = RegistryError::AlreadyRegistered(id);
        assert_eq!(err.to_string(), "connection client-7 is already registered");
    }

    #[test]
    fn encode_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err: CodecError = json_err.into();
        assert!(err.to_string().starts_with("failed to encode event"));
    }
}
