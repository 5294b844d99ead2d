//! API request handlers.

use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;
use sysinfo::{ProcessesToUpdate, System};

use crate::execution::TaskRunner;
use crate::metrics::Metrics;
use crate::scheduler::CronHandle;

use super::errors::ApiError;
use super::responses::HealthResponse;

/// Shared application state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub handle: CronHandle,
    pub runner: Arc<TaskRunner>,
    pub metrics: Metrics,
}

/// Count processes on the host.
///
/// `None` on platforms sysinfo cannot inspect, or when nothing was listed.
pub fn process_count() -> Option<usize> {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        return None;
    }
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let count = system.processes().len();
    (count > 0).then_some(count)
}

/// Health check endpoint.
pub async fn health(State(state): State<ApiState>) -> Result<String, ApiError> {
    let tasks = state.handle.entries().await?.len();
    // Process enumeration reads every process entry, so keep it off the runtime threads
    let processes = tokio::task::spawn_blocking(process_count)
        .await
        .ok()
        .flatten();
    let body = HealthResponse {
        tasks,
        running: state.runner.running(),
        processes,
    };
    Ok(body.to_string())
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    ))
}
