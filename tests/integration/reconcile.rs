//! Reconciliation integration tests.
//!
//! These tests load real descriptor files from a temporary directory and
//! check the engine's live entry set afterwards.

use bob::{ReconcileError, SaveOn, SaveOutput, Task};

use crate::common::{Harness, descriptor};

/// Test: Every enabled task with a valid schedule becomes exactly one entry,
/// carrying the file's content.
#[tokio::test]
async fn test_entries_match_descriptor_files() {
    let harness = Harness::new();
    let backup = harness.write_descriptor(
        "backup.yml",
        &descriptor("backup", "0 3 * * *", "tar czf /tmp/b.tgz /etc", "on-failure"),
    );
    harness.write_descriptor(
        "report.yaml",
        &descriptor("report", "@hourly", "echo report", "on-start,on-success"),
    );
    harness.write_descriptor(
        "paused.yml",
        "task_name: paused\nschedule: \"@daily\"\ncommand: \"true\"\nenabled: false\n",
    );
    harness.write_descriptor("notes.txt", "not a descriptor");

    let summary = harness.reconciler.reconcile().await.unwrap();
    assert_eq!(summary.loaded, 3);
    assert_eq!(summary.registered, 2);
    assert_eq!(summary.disabled, 1);

    let entries = harness.handle.entries().await.unwrap();
    assert_eq!(entries.len(), 2);

    let expected = Task::new("backup", "0 3 * * *", "tar czf /tmp/b.tgz /etc")
        .with_save_output(SaveOutput::none().with(SaveOn::OnFailure))
        .with_source(&backup);
    let armed = entries
        .iter()
        .find(|e| e.task.name() == "backup")
        .unwrap();
    assert_eq!(armed.task, expected);
    assert_eq!(armed.expression, "0 3 * * *");
    assert!(armed.next_fire.is_some());
}

/// Test: Running the same pass twice yields the same tasks.
#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let harness = Harness::new();
    harness.write_descriptor("a.yml", &descriptor("a", "@hourly", "echo a", ""));
    harness.write_descriptor("b.yml", &descriptor("b", "*/5 * * * *", "echo b", ""));

    harness.reconciler.reconcile().await.unwrap();
    let first: Vec<Task> = harness
        .handle
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.task)
        .collect();

    harness.reconciler.reconcile().await.unwrap();
    let second: Vec<Task> = harness
        .handle
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.task)
        .collect();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

/// Test: A descriptor missing a required field is left out and counted once
/// per pass.
#[tokio::test]
async fn test_incomplete_descriptor_counts_one_failure_per_pass() {
    let harness = Harness::new();
    harness.write_descriptor("ok.yml", &descriptor("ok", "@hourly", "true", ""));
    harness.write_descriptor(
        "no-command.yml",
        "task_name: broken\nschedule: \"@hourly\"\n",
    );
    harness.write_descriptor("garbage.yml", "task_name: [unclosed\n");

    let summary = harness.reconciler.reconcile().await.unwrap();
    assert_eq!(summary.descriptor_failures, 2);
    assert_eq!(summary.registered, 1);
    assert_eq!(harness.metrics.yaml_parse_failure_count("no-command.yml"), 1);
    assert_eq!(harness.metrics.yaml_parse_failure_count("garbage.yml"), 1);

    harness.reconciler.reconcile().await.unwrap();
    assert_eq!(harness.metrics.yaml_parse_failure_count("no-command.yml"), 2);
    assert_eq!(harness.metrics.yaml_parse_failure_count("ok.yml"), 0);
}

/// Test: A task name that is a path is refused before it can be armed.
#[tokio::test]
async fn test_task_name_with_path_is_a_descriptor_failure() {
    let harness = Harness::new();
    harness.write_descriptor("ok.yml", &descriptor("ok", "@hourly", "true", ""));
    harness.write_descriptor(
        "escape.yml",
        &descriptor("../../escaped", "* * * * * *", "true", "on-start"),
    );
    harness.write_descriptor(
        "absolute.yml",
        &descriptor("/tmp/bob-absolute", "* * * * * *", "true", "on-start"),
    );

    let summary = harness.reconciler.reconcile().await.unwrap();

    assert_eq!(summary.descriptor_failures, 2);
    assert_eq!(harness.metrics.yaml_parse_failure_count("escape.yml"), 1);
    assert_eq!(harness.metrics.yaml_parse_failure_count("absolute.yml"), 1);
    let names: Vec<String> = harness
        .handle
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.task.name().to_string())
        .collect();
    assert_eq!(names, vec!["ok"]);
}

/// Test: An invalid cron expression excludes only its own task.
#[tokio::test]
async fn test_invalid_schedule_excludes_only_that_task() {
    let harness = Harness::new();
    harness.write_descriptor("good.yml", &descriptor("good", "@daily", "true", ""));
    harness.write_descriptor("bad.yml", &descriptor("bad", "61 * * * *", "true", ""));

    let summary = harness.reconciler.reconcile().await.unwrap();

    assert_eq!(summary.schedule_failures, 1);
    assert_eq!(harness.metrics.job_parse_failure_count("bad"), 1);
    let names: Vec<String> = harness
        .handle
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.task.name().to_string())
        .collect();
    assert_eq!(names, vec!["good"]);
}

/// Test: A deleted descriptor disappears on the next pass.
#[tokio::test]
async fn test_deleted_descriptor_is_disarmed() {
    let harness = Harness::new();
    let doomed = harness.write_descriptor("doomed.yml", &descriptor("doomed", "@hourly", "true", ""));
    harness.write_descriptor("kept.yml", &descriptor("kept", "@hourly", "true", ""));

    harness.reconciler.reconcile().await.unwrap();
    assert_eq!(harness.handle.entries().await.unwrap().len(), 2);

    std::fs::remove_file(doomed).unwrap();
    harness.reconciler.reconcile().await.unwrap();

    let entries = harness.handle.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].task.name(), "kept");
}

/// Test: A task directory that vanishes leaves the schedule empty.
#[tokio::test]
async fn test_unreadable_directory_clears_schedule() {
    let harness = Harness::new();
    harness.write_descriptor("a.yml", &descriptor("a", "@hourly", "true", ""));
    harness.reconciler.reconcile().await.unwrap();
    assert_eq!(harness.handle.entries().await.unwrap().len(), 1);

    std::fs::remove_dir_all(harness.tasks.path()).unwrap();
    let result = harness.reconciler.reconcile().await;

    assert!(matches!(result, Err(ReconcileError::Load(_))));
    assert!(harness.handle.entries().await.unwrap().is_empty());
}

/// Test: The bundled example descriptors all parse.
#[test]
fn test_bundled_examples_load() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("example-tasks");
    let report = bob::load_tasks_from_directory(&dir).unwrap();

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.tasks.len(), 2);
    assert_eq!(report.enabled().count(), 1);
    for task in &report.tasks {
        bob::Schedule::new(task.schedule()).unwrap();
    }
}
