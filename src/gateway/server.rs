//! Gateway Server
//!
//! HTTP server setup with the middleware stack and graceful shutdown.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::GatewayConfig;
use crate::directory::InMemoryDirectory;
use crate::engine::EngineHandle;
use crate::ledger::InMemoryLedger;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// HTTP front for the wager engine.
pub struct GatewayServer {
    config: GatewayConfig,
    engine: EngineHandle,
    directory: Arc<InMemoryDirectory>,
    ledger: Arc<InMemoryLedger>,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        engine: EngineHandle,
        directory: Arc<InMemoryDirectory>,
        ledger: Arc<InMemoryLedger>,
    ) -> Self {
        Self { config, engine, directory, ledger }
    }

    /// Serve until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.socket_addr()?;
        let app = self.create_app();

        info!("wager gateway listening on http://{}", addr);
        self.log_endpoints();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("gateway stopped");
        Ok(())
    }

    /// Build the application with the full middleware stack. Public so
    /// tests can drive the router without binding a socket.
    pub fn create_app(&self) -> axum::Router {
        let state = Arc::new(AppState {
            engine: self.engine.clone(),
            directory: self.directory.clone(),
            ledger: self.ledger.clone(),
            metrics: self.engine.metrics(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });

        create_router(state)
            // Request ID middleware (first for tracing)
            .layer(axum::middleware::from_fn(request_id_middleware))
            // CORS layer (before timeout to handle preflight)
            .layer(create_cors_layer(self.config.allowed_origins.clone()))
            // Timeout layer
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs,
            )))
            // Tracing layer (last for complete request tracing)
            .layer(TraceLayer::new_for_http())
    }

    fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.listen_address.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }

    fn log_endpoints(&self) {
        info!("available endpoints:");
        info!("  GET  /health                        - health check");
        info!("  GET  /status                        - service status");
        info!("  GET  /wagers                        - live wager snapshot");
        info!("  POST /command                       - chat command intake");
        info!("  POST /event/{{death,disconnect,dock,menu-open}} - lifecycle events");
        info!("  PUT  /players/:participant          - directory upsert");
        info!("  PUT  /players/:participant/balance  - ledger feed");
        info!("  GET  /ws?participant=:id            - notice stream");
        info!("  GET  /metrics                       - Prometheus metrics");
    }
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C signal");
        },
        _ = terminate => {
            info!("received terminate signal");
        },
    }
}
