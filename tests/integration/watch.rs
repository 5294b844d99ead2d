//! Directory watch integration tests.
//!
//! These tests run the watch loop against a real directory and change files
//! underneath it.

use bob::{DirectoryWatcher, watch_and_reconcile};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{Harness, descriptor};

async fn entry_names(harness: &Harness) -> Vec<String> {
    harness
        .handle
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.task.name().to_string())
        .collect()
}

async fn wait_for_names(harness: &Harness, expected: &[&str]) {
    let start = tokio::time::Instant::now();
    loop {
        let names = entry_names(harness).await;
        if names == expected {
            return;
        }
        if start.elapsed() > Duration::from_secs(5) {
            panic!("Timeout waiting for entries {:?}, have {:?}", expected, names);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Test: The loop reconciles at startup and again after each write.
#[tokio::test]
async fn test_writes_trigger_reconciliation() {
    let harness = Harness::new();
    harness.write_descriptor("a.yml", &descriptor("a", "@hourly", "true", ""));

    let watcher = DirectoryWatcher::new(harness.tasks.path()).unwrap();
    let watch_loop = tokio::spawn(watch_and_reconcile(
        watcher,
        Arc::clone(&harness.reconciler),
        Duration::from_millis(50),
    ));

    wait_for_names(&harness, &["a"]).await;

    harness.write_descriptor("b.yml", &descriptor("b", "@daily", "true", ""));
    wait_for_names(&harness, &["a", "b"]).await;

    watch_loop.abort();
}

/// Test: Deleting a descriptor then writing to the directory disarms it.
#[tokio::test]
async fn test_delete_then_write_disarms_task() {
    let harness = Harness::new();
    let doomed = harness.write_descriptor("doomed.yml", &descriptor("doomed", "@hourly", "true", ""));
    harness.write_descriptor("kept.yml", &descriptor("kept", "@hourly", "true", ""));

    let watcher = DirectoryWatcher::new(harness.tasks.path()).unwrap();
    let watch_loop = tokio::spawn(watch_and_reconcile(
        watcher,
        Arc::clone(&harness.reconciler),
        Duration::from_millis(50),
    ));
    wait_for_names(&harness, &["doomed", "kept"]).await;

    std::fs::remove_file(doomed).unwrap();
    harness.write_descriptor("kept.yml", &descriptor("kept", "@daily", "true", ""));

    wait_for_names(&harness, &["kept"]).await;
    let entries = harness.handle.entries().await.unwrap();
    assert_eq!(entries[0].expression, "@daily");

    watch_loop.abort();
}
