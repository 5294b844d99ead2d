//! API integration tests.
//!
//! These tests verify the health and metrics endpoints respond correctly.

use bob::api::{ApiState, build_router, start_server};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use crate::common::{Harness, descriptor};

fn state(harness: &Harness) -> ApiState {
    ApiState {
        handle: harness.handle.clone(),
        runner: Arc::clone(&harness.runner),
        metrics: harness.metrics.clone(),
    }
}

async fn get(harness: &Harness, uri: &str) -> (StatusCode, String) {
    let router = build_router(state(harness));
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

/// Test: Health endpoint reports armed entries and running executions.
#[tokio::test]
async fn test_health_endpoint() {
    let harness = Harness::new();
    harness.write_descriptor("a.yml", &descriptor("a", "@hourly", "true", ""));
    harness.write_descriptor("b.yml", &descriptor("b", "@daily", "true", ""));
    harness.reconciler.reconcile().await.unwrap();

    let (status, body) = get(&harness, "/healhtz").await;

    assert_eq!(status, StatusCode::OK);
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "tasks: 2");
    assert_eq!(lines[1], "running: 0");
    assert!(lines[2].starts_with("processes: "));
    if cfg!(target_os = "linux") {
        let processes: usize = lines[2]["processes: ".len()..].parse().unwrap();
        assert!(processes >= 1);
    }
}

/// Test: The correctly spelled path serves the same body.
#[tokio::test]
async fn test_healthz_alias() {
    let harness = Harness::new();

    let (status, body) = get(&harness, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("tasks: 0\nrunning: 0\n"));
}

/// Test: Health reports unavailable once the engine has stopped.
#[tokio::test]
async fn test_health_after_shutdown() {
    let harness = Harness::new();
    harness.handle.shutdown().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let (status, _) = get(&harness, "/healhtz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

/// Test: Metrics endpoint exposes the parse failure counters.
#[tokio::test]
async fn test_metrics_endpoint() {
    let harness = Harness::new();
    harness.write_descriptor("broken.yml", "schedule: \"@hourly\"\n");
    harness.write_descriptor("badcron.yml", &descriptor("badcron", "not cron", "true", ""));
    harness.reconciler.reconcile().await.unwrap();

    let (status, body) = get(&harness, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("scheduler_yaml_parse_failure{file_name=\"broken.yml\"} 1"));
    assert!(body.contains("scheduler_job_parse_failure{job_name=\"badcron\"} 1"));
}

/// Test: Unknown paths are not found.
#[tokio::test]
async fn test_unknown_path() {
    let harness = Harness::new();

    let (status, _) = get(&harness, "/api/jobs").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Test: Binding a port that is already taken is reported to the caller.
#[tokio::test]
async fn test_start_server_reports_bind_failure() {
    let harness = Harness::new();
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let result = start_server(addr, state(&harness)).await;

    assert!(result.is_err());
}
