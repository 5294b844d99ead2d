//! Execution lifecycle tracking.
//!
//! [`TaskRunner`] turns one fire of a task into a full lifecycle:
//! 1. Apply the overlap policy for the task name
//! 2. Record the start marker (and the `.started` artifact if requested)
//! 3. Run the command through the [`CommandExecutor`]
//! 4. Record the success or failure marker and artifact
//!
//! [`TaskJob`] binds a task snapshot to a shared runner so it can be handed to
//! the cron engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::config::{OverlapPolicy, SchedulerConfig};
use crate::core::job::Job;
use crate::core::task::{SaveOn, Task};
use crate::core::types::RunId;

use super::command::{CommandExecutor, ShellExecutor};
use super::output::{Marker, OutputStore};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed,
}

/// Record of one completed run.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub run_id: RunId,
    pub task_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: ExecutionOutcome,
    /// Combined stdout and stderr.
    pub output: String,
    /// Failure detail, `None` on success.
    pub error: Option<String>,
}

impl ExecutionRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome == ExecutionOutcome::Succeeded
    }
}

/// Decrements the running counter when a run ends, however it ends.
struct RunningGuard<'a>(&'a AtomicUsize);

impl<'a> RunningGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs tasks and records their lifecycle on disk.
pub struct TaskRunner {
    executor: Arc<dyn CommandExecutor>,
    store: OutputStore,
    policy: OverlapPolicy,
    /// One gate per task name. Entries outlive reconciliation passes so a run
    /// started before a reload still blocks the reloaded entry.
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    running: AtomicUsize,
}

impl TaskRunner {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        store: OutputStore,
        policy: OverlapPolicy,
    ) -> Self {
        Self {
            executor,
            store,
            policy,
            gates: Mutex::new(HashMap::new()),
            running: AtomicUsize::new(0),
        }
    }

    /// Build a runner using the configured shell, timeout, output root and
    /// overlap policy.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let mut executor = ShellExecutor::new(&config.shell);
        if let Some(timeout) = config.command_timeout {
            executor = executor.with_timeout(timeout);
        }
        Self::new(
            Arc::new(executor),
            OutputStore::new(&config.output_directory),
            config.overlap_policy,
        )
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Number of runs currently executing.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    fn gate(&self, task_name: &str) -> Arc<AsyncMutex<()>> {
        let mut gates = self
            .gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            gates
                .entry(task_name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    /// Wait at the task's gate as the overlap policy dictates.
    ///
    /// `Ok(None)` means run without holding the gate; `Err(())` means skip.
    async fn admit(&self, task_name: &str) -> Result<Option<OwnedMutexGuard<()>>, ()> {
        match self.policy {
            OverlapPolicy::Allow => Ok(None),
            OverlapPolicy::Skip => self.gate(task_name).try_lock_owned().map(Some).map_err(|_| ()),
            OverlapPolicy::Queue => Ok(Some(self.gate(task_name).lock_owned().await)),
        }
    }

    /// Run `task` once. Returns `None` if the overlap policy skipped it.
    pub async fn execute(&self, task: &Task) -> Option<ExecutionRecord> {
        let name = task.name();
        let _permit = match self.admit(name).await {
            Ok(permit) => permit,
            Err(()) => {
                tracing::info!(task = %name, "Previous run still in progress, skipping");
                return None;
            }
        };
        let _running = RunningGuard::enter(&self.running);

        let run_id = RunId::new();
        let save = task.save_output();
        let started_at = Utc::now();

        tracing::info!(task = %name, run_id = %run_id, command = %task.command(), "Task started");
        self.store.write_marker(name, Marker::Start, started_at);
        if save.contains(SaveOn::OnStart) {
            self.store
                .write_artifact(name, Marker::Start, started_at, &format!("{}\n", task.command()));
        }

        let result = self.executor.run(task.command()).await;
        let finished_at = Utc::now();
        let elapsed_ms = (finished_at - started_at).num_milliseconds();

        let outcome = if result.success {
            tracing::info!(task = %name, run_id = %run_id, elapsed_ms, "Task succeeded");
            self.store.write_marker(name, Marker::Success, finished_at);
            if save.contains(SaveOn::OnSuccess) {
                self.store
                    .write_artifact(name, Marker::Success, finished_at, &result.output);
            }
            ExecutionOutcome::Succeeded
        } else {
            let detail = result.error.as_deref().unwrap_or("command failed");
            tracing::warn!(
                task = %name,
                run_id = %run_id,
                elapsed_ms,
                error = %detail,
                "Task failed"
            );
            self.store.write_marker(name, Marker::Failure, finished_at);
            if save.contains(SaveOn::OnFailure) {
                self.store.write_artifact(
                    name,
                    Marker::Failure,
                    finished_at,
                    &format!("{}\n{}", detail, result.output),
                );
            }
            ExecutionOutcome::Failed
        };

        Some(ExecutionRecord {
            run_id,
            task_name: name.to_string(),
            started_at,
            finished_at,
            outcome,
            output: result.output,
            error: result.error,
        })
    }
}

/// A task snapshot bound to a shared runner.
pub struct TaskJob {
    task: Task,
    runner: Arc<TaskRunner>,
}

impl TaskJob {
    pub fn new(task: Task, runner: Arc<TaskRunner>) -> Self {
        Self { task, runner }
    }
}

#[async_trait]
impl Job for TaskJob {
    fn task(&self) -> &Task {
        &self.task
    }

    async fn run(&self) {
        self.runner.execute(&self.task).await;
    }
}
