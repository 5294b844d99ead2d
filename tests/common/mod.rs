//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use bob::{CronEngine, CronHandle, Metrics, OverlapPolicy, Reconciler, SchedulerConfig, TaskRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A scheduler wired the way `main` wires it, over temporary directories.
pub struct Harness {
    pub tasks: TempDir,
    pub output: TempDir,
    pub handle: CronHandle,
    pub runner: Arc<TaskRunner>,
    pub metrics: Metrics,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(OverlapPolicy::Skip)
    }

    pub fn with_policy(policy: OverlapPolicy) -> Self {
        let tasks = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let config =
            SchedulerConfig::new(tasks.path(), output.path()).with_overlap_policy(policy);

        let (handle, _engine) = CronEngine::new().start();
        let runner = Arc::new(TaskRunner::from_config(&config));
        let metrics = Metrics::new().unwrap();
        let reconciler = Arc::new(Reconciler::for_directory(
            tasks.path(),
            handle.clone(),
            Arc::clone(&runner),
            metrics.clone(),
        ));

        Self {
            tasks,
            output,
            handle,
            runner,
            metrics,
            reconciler,
        }
    }

    /// Write a descriptor file into the task directory.
    pub fn write_descriptor(&self, file_name: &str, yaml: &str) -> PathBuf {
        let path = self.tasks.path().join(file_name);
        std::fs::write(&path, yaml).unwrap();
        path
    }

    /// Output directory for one task.
    pub fn task_output(&self, task_name: &str) -> PathBuf {
        self.output.path().join(task_name)
    }
}

/// Descriptor YAML for a task with the given fields.
pub fn descriptor(name: &str, schedule: &str, command: &str, save_output: &str) -> String {
    format!(
        "task_name: {}\nschedule: \"{}\"\ncommand: \"{}\"\nsave_output: \"{}\"\n",
        name, schedule, command, save_output
    )
}

/// Files in `dir` whose names end with `suffix`.
pub fn artifacts(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let mut found: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.to_string_lossy().ends_with(suffix))
                .collect();
            found.sort();
            found
        }
        Err(_) => Vec::new(),
    }
}

/// Poll `condition` every 20ms until it holds or `timeout` passes.
///
/// This is more reliable than fixed sleeps since execution time can vary.
///
/// # Panics
///
/// Panics if the timeout is reached first.
pub async fn wait_for(what: &str, timeout: Duration, mut condition: impl FnMut() -> bool) {
    let start = tokio::time::Instant::now();
    loop {
        if condition() {
            return;
        }
        if start.elapsed() > timeout {
            panic!("Timeout after {:?} waiting for {}", timeout, what);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
