//! # bridge-core
//!
//! Foundation types shared by every event bridge crate:
//!
//! - **Identity**: [`ConnectionId`] and the monotonic [`IdAllocator`]
//! - **Roles**: [`Role`] (hub or peer) and handshake negotiation via [`negotiate`]
//! - **Events**: the [`Event`] enum covering the known wire kinds plus an open map
//! - **Codec**: [`decode`] / [`decode_event`] / [`encode`] between raw frames and events
//! - **Errors**: [`CodecError`], [`RegistryError`]
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` sink

#![deny(unsafe_code)]

pub mod codec;
pub mod errors;
pub mod events;
pub mod handshake;
pub mod ids;
pub mod logging;

pub use codec::{DecodeFailure, decode, decode_event, encode};
pub use errors::{CodecError, RegistryError};
pub use events::{CLIENT_ACK_MESSAGE, Event, now_millis};
pub use handshake::{AuthRejected, Handshake, HUB_PROTOCOL, PEER_PROTOCOL, Role, negotiate};
pub use ids::{ConnectionId, IdAllocator};
