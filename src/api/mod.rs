//! Synced Canvas HTTP API
//!
//! HTTP layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Canvas
//! - `GET /canvas/lines` - Snapshot of the drawing history
//! - `POST /canvas/reset` - Clear the drawing history
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws` - Real-time stroke stream
//!
//! Any other path is served from the configured static directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use synced_canvas::api::{serve, AppState};
//! use synced_canvas::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let state = AppState::new(config.hub.clone());
//!     serve(state, &config.server).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::websocket::websocket_handler;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let canvas_routes = Router::new()
        .route("/lines", get(routes::canvas::get_lines))
        .route("/reset", post(routes::canvas::reset));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    let mut router = Router::new()
        .nest("/canvas", canvas_routes)
        .nest("/health", health_routes)
        .route("/ws", get(websocket_handler));

    match static_dir {
        Some(dir) if dir.is_dir() => {
            router = router.fallback_service(ServeDir::new(dir));
        }
        Some(dir) => {
            tracing::warn!("Static directory {:?} not found, web client will not be served", dir);
        }
        None => {}
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the server and run until a shutdown signal arrives
///
/// On shutdown the listener stops accepting first, then every WebSocket is
/// closed through the hub.
pub async fn serve(state: AppState, config: &ServerConfig) -> ApiResult<()> {
    let hub = Arc::clone(&state.hub);
    let state = state.with_max_message_size(config.max_message_size);
    let router = build_router(state, Some(config.static_dir.as_path()));

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!("Synced canvas listening on {}", listener.local_addr()?);

    let shutdown = CancellationToken::new();
    let closer = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
            hub.close_all().await;
        }
    });

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await;

    if let Err(e) = result {
        closer.abort();
        return Err(ApiError::Internal(format!("Server error: {}", e)));
    }

    closer
        .await
        .map_err(|e| ApiError::Internal(format!("Shutdown task failed: {}", e)))?;

    tracing::info!("Synced canvas shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
