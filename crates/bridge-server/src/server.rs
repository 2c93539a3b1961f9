//! `BridgeServer`: Axum HTTP + `WebSocket` server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header::{HOST, SEC_WEBSOCKET_PROTOCOL};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use bridge_core::{IdAllocator, Role, negotiate};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::lifecycle::{self, ConnectionContext};
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::router::MessageRouter;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Connection ID source.
    pub ids: Arc<IdAllocator>,
    /// Inbound event router.
    pub router: Arc<MessageRouter>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
}

impl AppState {
    fn connection_context(&self) -> ConnectionContext {
        ConnectionContext {
            registry: Arc::clone(&self.registry),
            router: Arc::clone(&self.router),
            heartbeat_interval: self.config.heartbeat_interval(),
            heartbeat_timeout: self.config.heartbeat_timeout(),
            send_queue_capacity: self.config.send_queue_capacity,
        }
    }
}

/// The event bridge server.
pub struct BridgeServer {
    state: AppState,
}

impl BridgeServer {
    /// Create a new server.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Arc::new(MessageRouter::new(Arc::clone(&registry), config.debug));
        Self {
            state: AppState {
                registry,
                ids: Arc::new(IdAllocator::new()),
                router,
                shutdown: Arc::new(ShutdownCoordinator::new()),
                config: Arc::new(config),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the Axum router.
    ///
    /// `/health` reports status; every other path accepts `WebSocket` upgrades.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .fallback(ws_handler)
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.state.config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let app = self.router();
        let token = self.state.shutdown.token();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server terminated");
            }
        });

        info!(addr = %local_addr, auth = self.state.config.auth_enabled(), "event bridge listening");
        Ok((local_addr, handle))
    }

    /// Get the connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.registry.count(),
        state.registry.hub_count(),
    ))
}

/// Any path: negotiate role, check the shared secret, upgrade.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let protocol = headers
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok());
    let query_token = query.get("token").map(String::as_str);
    let handshake = negotiate(protocol, query_token);

    if let Err(rejected) = handshake.authorize(&state.config.auth_token) {
        warn!(role = ?rejected.role, path = uri.path(), "rejected connection: invalid token");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    let role = handshake.role();
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| state.config.bind_address(), str::to_owned);
    let mask_token = state.config.auth_enabled() && query_token.is_some_and(|t| !t.is_empty());
    let welcome = lifecycle::welcome_message(&host, uri.path(), mask_token);

    let ws = match handshake.role_token {
        Some(token) => ws.protocols([token]),
        None => ws,
    };

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, role, welcome))
}

/// Allocate an ID for the upgraded socket and run it to completion.
async fn handle_socket(socket: WebSocket, state: AppState, role: Role, welcome: String) {
    let id = state.ids.allocate(role);
    let ctx = state.connection_context();
    let cancel = state.shutdown.child_token();

    if let Err(e) = lifecycle::run_connection(socket, id, welcome, ctx, cancel).await {
        error!(client_id = %id, error = %e, "failed to register connection");
    }
}
