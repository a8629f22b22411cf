//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::{handlers::*, websocket::notice_stream_handler};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Build the gateway router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Service status
        .route("/status", get(status_handler))
        // Live wagers
        .route("/wagers", get(wagers_handler))
        // Chat command intake
        .route("/command", post(command_handler))
        // Host lifecycle events
        .route("/event/death", post(death_handler))
        .route("/event/disconnect", post(disconnect_handler))
        .route("/event/dock", post(dock_handler))
        .route("/event/menu-open", post(menu_open_handler))
        // Player directory and ledger feeds
        .route("/players/:participant", put(upsert_player_handler))
        .route("/players/:participant/balance", put(set_balance_handler))
        // WebSocket notice stream
        .route("/ws", get(notice_stream_handler))
        // Metrics endpoint for Prometheus
        .route("/metrics", get(metrics_handler))
        // Attach shared state
        .with_state(state)
}
