//! # bridge-server
//!
//! Axum HTTP + `WebSocket` server for the event bridge.
//!
//! - `WebSocket` endpoint: handshake negotiation, shared-secret check, upgrade
//! - Connection registry keyed by [`bridge_core::ConnectionId`]
//! - Message router: hub events fan out to every other connection, peer
//!   events are acknowledged only
//! - Per-connection lifecycle with heartbeat ping/pong
//! - `/health` endpoint and graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::{AppState, BridgeServer};
pub use shutdown::ShutdownCoordinator;
