//! Message envelope codec.
//!
//! Inbound frames are parsed as JSON objects. Anything else (invalid JSON,
//! arrays, scalars, plain text) produces a [`DecodeFailure`] that carries the
//! raw payload; the caller turns it into an `unknown-message` event. Decoding
//! never fails fatally.

use serde_json::{Map, Value};

use crate::errors::CodecError;
use crate::events::Event;

/// An inbound payload that was not a JSON object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeFailure {
    /// Raw payload as text (lossy UTF-8).
    pub text: String,
}

impl DecodeFailure {
    /// Build the `unknown-message` fallback event for this payload.
    pub fn into_event(self) -> Event {
        Event::unknown_message(self.text)
    }
}

/// Parse a raw frame as a JSON object.
pub fn decode(payload: &[u8]) -> Result<Map<String, Value>, DecodeFailure> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(DecodeFailure {
            text: String::from_utf8_lossy(payload).into_owned(),
        }),
    }
}

/// Decode a raw frame into an event, falling back to `unknown-message`.
pub fn decode_event(payload: &[u8]) -> Event {
    decode(payload).map_or_else(DecodeFailure::into_event, Event::Open)
}

/// Serialize an event as JSON text.
pub fn encode(event: &Event) -> Result<String, CodecError> {
    Ok(serde_json::to_string(event)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
