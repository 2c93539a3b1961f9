//! `WebSocket` connection handling.
//!
//! - [`connection`]: per-client outbound queue and liveness state
//! - [`registry`]: live connections by ID
//! - [`router`]: hub broadcast and peer acknowledgement
//! - [`heartbeat`]: ping/pong liveness monitor
//! - [`lifecycle`]: register, receive loop, unregister

pub mod connection;
pub mod heartbeat;
pub mod lifecycle;
pub mod registry;
pub mod router;
