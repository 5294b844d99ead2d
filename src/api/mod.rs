//! HTTP health and metrics endpoints.
//!
//! Provides a plain-text health summary and a Prometheus scrape endpoint.

mod errors;
mod handlers;
mod responses;

pub use errors::ApiError;
pub use handlers::{ApiState, process_count};
pub use responses::HealthResponse;

use axum::{Router, routing::get};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Build the API router with all endpoints.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        // The misspelled path is what existing probes are configured with
        .route("/healhtz", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server.
///
/// Binding happens before this returns, so a port conflict is reported to
/// the caller. The server then runs until the task is aborted or the process
/// exits.
pub async fn start_server(
    addr: SocketAddr,
    state: ApiState,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let router = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Health check listening on http://{}", listener.local_addr()?);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(handle)
}
