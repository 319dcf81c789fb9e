//! Gateway server setup
//!
//! Provides the WebSocket/HTTP server configuration and routes.

mod admin;
mod handler;
mod state;

pub use admin::{ApiError, BulkNotificationRequest, BulkNotificationResponse};
pub use handler::{counselor_socket_handler, user_socket_handler};
pub use state::GatewayState;

use crate::dispatch::{Dispatcher, LivenessSweeper};
use crate::registry::ConnectionRegistry;
use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use campus_common::{AppConfig, AppError, CorsConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws/user/:identifier", get(user_socket_handler))
        .route("/ws/counselor/:identifier", get(counselor_socket_handler))
        .route("/admin/notifications/bulk", post(admin::send_bulk_notification))
        .route("/admin/connections/stats", get(admin::connection_stats))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    let cors = cors_layer(&state.config().cors);

    create_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Initialize the registry and dispatcher and create `GatewayState`
pub fn create_gateway_state(config: AppConfig) -> GatewayState {
    let registry = ConnectionRegistry::new_shared();
    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        Duration::from_millis(config.connections.send_timeout_ms),
    ));

    GatewayState::new(registry, dispatcher, config)
}

/// Spawn the periodic liveness sweeper for this state
pub fn spawn_sweeper(state: &GatewayState) -> JoinHandle<()> {
    let sweeper = Arc::new(LivenessSweeper::new(state.dispatcher().clone()));
    let period = Duration::from_secs(state.config().connections.sweep_interval_secs);

    tracing::info!(period_secs = period.as_secs(), "Liveness sweeper started");
    sweeper.spawn(period)
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = create_gateway_state(config);
    let sweeper_handle = spawn_sweeper(&state);

    let app = create_app(state.clone());
    let result = run_server(app, addr).await;

    // Explicit lifecycle end: stop probing, then close every held channel
    sweeper_handle.abort();
    state.registry().shutdown();

    result
}
