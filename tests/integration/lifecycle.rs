//! Execution lifecycle integration tests.
//!
//! These tests arm real descriptors on a per-second schedule and check what
//! the runs leave behind in the output directory.

use bob::OverlapPolicy;
use bob::execution::TIMESTAMP_FORMAT;
use std::path::Path;
use std::time::Duration;

use crate::common::{Harness, artifacts, descriptor, wait_for};

const EVERY_SECOND: &str = "* * * * * *";

fn assert_timestamp_line(line: &str) {
    assert!(
        chrono::DateTime::parse_from_str(line, TIMESTAMP_FORMAT).is_ok(),
        "not a timestamp line: {:?}",
        line
    );
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Test: `echo hi` saved on success produces an artifact with a timestamp
/// line followed by the output.
#[tokio::test]
async fn test_successful_run_saves_output() {
    let harness = Harness::new();
    harness.write_descriptor(
        "hello.yml",
        &descriptor("hello", EVERY_SECOND, "echo hi", "on-success"),
    );
    harness.reconciler.reconcile().await.unwrap();

    let dir = harness.task_output("hello");
    wait_for("a .succeeded artifact", Duration::from_secs(5), || {
        !artifacts(&dir, ".succeeded").is_empty()
    })
    .await;
    harness.handle.clear().await.unwrap();

    let lines = read_lines(&artifacts(&dir, ".succeeded")[0]);
    assert_timestamp_line(&lines[0]);
    assert_eq!(lines[1], "hi");

    assert!(dir.join("last-start").exists());
    assert!(dir.join("last-success").exists());
    assert!(artifacts(&dir, ".failed").is_empty());
}

/// Test: With only on-failure saved, a success leaves markers but no
/// artifact, and a failure leaves exactly one `.failed` artifact.
#[tokio::test]
async fn test_on_failure_only_policy() {
    let harness = Harness::new();
    harness.write_descriptor(
        "quiet.yml",
        &descriptor("quiet", EVERY_SECOND, "echo fine", "on-failure"),
    );
    harness.reconciler.reconcile().await.unwrap();

    let dir = harness.task_output("quiet");
    wait_for("last-success marker", Duration::from_secs(5), || {
        dir.join("last-success").exists()
    })
    .await;
    assert!(dir.join("last-start").exists());
    assert!(artifacts(&dir, ".succeeded").is_empty());

    harness.write_descriptor(
        "quiet.yml",
        &descriptor("quiet", "@yearly", "echo oops; exit 7", "on-failure"),
    );
    harness.reconciler.reconcile().await.unwrap();
    wait_for("earlier runs to finish", Duration::from_secs(3), || {
        harness.runner.running() == 0
    })
    .await;
    let task = harness.handle.entries().await.unwrap()[0].task.clone();
    let record = harness.runner.execute(&task).await.unwrap();
    assert!(!record.succeeded());

    let failed = artifacts(&dir, ".failed");
    assert_eq!(failed.len(), 1);
    let lines = read_lines(&failed[0]);
    assert_timestamp_line(&lines[0]);
    assert_eq!(lines[1], "exit status 7");
    assert_eq!(lines[2], "oops");
    assert!(dir.join("last-failure").exists());
    assert!(artifacts(&dir, ".succeeded").is_empty());
}

/// Test: Two tasks due at the same instant both run.
#[tokio::test]
async fn test_simultaneous_tasks_both_run() {
    let harness = Harness::new();
    harness.write_descriptor("one.yml", &descriptor("one", EVERY_SECOND, "echo 1", "on-success"));
    harness.write_descriptor("two.yml", &descriptor("two", EVERY_SECOND, "echo 2", "on-success"));
    harness.reconciler.reconcile().await.unwrap();

    let one = harness.task_output("one");
    let two = harness.task_output("two");
    wait_for("artifacts from both tasks", Duration::from_secs(5), || {
        !artifacts(&one, ".succeeded").is_empty() && !artifacts(&two, ".succeeded").is_empty()
    })
    .await;
    harness.handle.clear().await.unwrap();
}

/// Test: A removed task stops running.
#[tokio::test]
async fn test_removed_task_stops_running() {
    let harness = Harness::new();
    let path = harness.write_descriptor(
        "brief.yml",
        &descriptor("brief", EVERY_SECOND, "echo tick", "on-success"),
    );
    harness.reconciler.reconcile().await.unwrap();

    let dir = harness.task_output("brief");
    wait_for("first run", Duration::from_secs(5), || {
        dir.join("last-success").exists()
    })
    .await;

    std::fs::remove_file(path).unwrap();
    harness.reconciler.reconcile().await.unwrap();
    assert!(harness.handle.entries().await.unwrap().is_empty());

    // Let any run that was already in flight finish
    tokio::time::sleep(Duration::from_millis(500)).await;
    let settled = artifacts(&dir, ".succeeded").len();
    tokio::time::sleep(Duration::from_millis(2200)).await;
    assert_eq!(artifacts(&dir, ".succeeded").len(), settled);
}

/// Test: Under `skip`, a fire while the task is running is dropped.
#[tokio::test]
async fn test_skip_policy_drops_overlapping_fire() {
    let harness = Harness::with_policy(OverlapPolicy::Skip);
    harness.write_descriptor(
        "slow.yml",
        &descriptor("slow", EVERY_SECOND, "sleep 2.5", "on-start"),
    );
    harness.reconciler.reconcile().await.unwrap();

    wait_for("run in progress", Duration::from_secs(3), || {
        harness.runner.running() == 1
    })
    .await;
    // Two more fires come due while the first run sleeps
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(harness.runner.running(), 1);
    harness.handle.clear().await.unwrap();
}

/// Test: Under `allow`, runs of the same task overlap.
#[tokio::test]
async fn test_allow_policy_overlaps_runs() {
    let harness = Harness::with_policy(OverlapPolicy::Allow);
    harness.write_descriptor(
        "slow.yml",
        &descriptor("slow", EVERY_SECOND, "sleep 3", "on-start"),
    );
    harness.reconciler.reconcile().await.unwrap();

    wait_for("two concurrent runs", Duration::from_secs(4), || {
        harness.runner.running() >= 2
    })
    .await;
    harness.handle.clear().await.unwrap();
}

/// Test: Under `queue`, a fire during a run waits and then runs.
#[tokio::test]
async fn test_queue_policy_serializes_runs() {
    let harness = Harness::with_policy(OverlapPolicy::Queue);
    harness.write_descriptor(
        "slow.yml",
        &descriptor("slow", "@yearly", "sleep 0.5; echo done", "on-success"),
    );
    harness.reconciler.reconcile().await.unwrap();
    let task = harness.handle.entries().await.unwrap()[0].task.clone();

    let first = {
        let runner = harness.runner.clone();
        let task = task.clone();
        tokio::spawn(async move { runner.execute(&task).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = harness.runner.execute(&task).await.unwrap();
    let first = first.await.unwrap().unwrap();

    assert!(first.succeeded() && second.succeeded());
    assert!(second.started_at >= first.finished_at);
}
