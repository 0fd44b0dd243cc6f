//! Router assembly and the server run loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::routes;
use crate::state::AppState;

/// Builds the full router with request tracing and the upload size limit.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_size_bytes();

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::apps::routes())
        .merge(routes::versions::routes())
        .merge(routes::updates::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs bootstrap in the background and flips readiness when it finishes.
///
/// A failed bootstrap is logged and the server still becomes ready; requests
/// then see whatever the registries contain.
pub fn spawn_bootstrap(state: &AppState) -> tokio::task::JoinHandle<()> {
    let service = Arc::clone(&state.service);
    let readiness = Arc::clone(&state.readiness);

    tokio::spawn(async move {
        if let Err(e) = service.bootstrap().await {
            error!(error = %e, "Bootstrap failed");
        }
        readiness.mark_ready();
        info!("Service ready");
    })
}

/// Starts the HTTP server and serves until Ctrl+C.
pub async fn run_server(config: Config) -> Result<()> {
    let upload_dir = &config.storage.upload_dir;
    std::fs::create_dir_all(upload_dir)
        .with_context(|| format!("Failed to create upload directory {}", upload_dir.display()))?;

    let addr = config.bind_address();
    info!(
        addr = %addr,
        upload_dir = %upload_dir.display(),
        max_upload_mb = config.limits.max_upload_size_mb,
        "Starting hot update server"
    );

    let state = AppState::new(config);
    spawn_bootstrap(&state);
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal, stopping server gracefully");
        })
        .await
        .context("Server error")?;

    Ok(())
}
