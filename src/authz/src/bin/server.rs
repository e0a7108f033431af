//! # SheetGate Decision Server
//!
//! HTTP front for the access decision engine.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `SHEET_ID` - Spreadsheet holding the Rules and Roles tables (required)
//! - `SHEETS_ENDPOINT` - Values API base URL (default: https://sheets.googleapis.com)
//! - `RULES_RANGE` / `ROLES_RANGE` - Table ranges
//! - `K_SERVICE` - Set on the managed runtime; selects the metadata server
//! - `SA_EMAIL` / `PROJECT_ID` - Impersonation target for local credentials
//! - `PORT` - HTTP server port (default: 9090)
//! - `RUST_LOG` - Log level (default: info)

use sheetgate_authz::server::{create_router, AppState};
use sheetgate_authz::{AccessDecisionEngine, AuthzConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

/// Main server entrypoint
#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SheetGate Decision Server v{}", sheetgate_authz::VERSION);

    let config = AuthzConfig::from_env();

    info!("Configuration:");
    info!("  Port: {}", config.port);
    info!("  Endpoint: {}", config.endpoint);
    info!("  Rules range: {}", config.rules_range);
    info!("  Roles range: {}", config.roles_range);
    info!("  Managed runtime: {}", config.is_managed());

    let engine = match AccessDecisionEngine::from_config(&config) {
        Ok(e) => e,
        Err(e) => {
            error!("Failed to initialize engine: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Engine initialization failed: {}", e),
            ));
        }
    };

    let app = create_router(AppState::new(Arc::new(engine)));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Starting HTTP server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind HTTP server: {}", e);
            return Err(e);
        }
    };

    match axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        Ok(()) => {
            info!("Server shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Server error: {}", e);
            Err(e)
        }
    }
}
