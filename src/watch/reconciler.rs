//! Reconciliation: make the live schedule match the descriptor directory.
//!
//! One pass loads every descriptor, drops the ones whose schedule does not
//! parse and hands the rest to the engine as a single `replace`. Runs already
//! in flight are left to finish.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, DescriptorSource, DirectoryLoader};
use crate::core::job::Job;
use crate::execution::{TaskJob, TaskRunner};
use crate::metrics::Metrics;
use crate::scheduler::{CronHandle, EntrySpec, SchedulerError};

/// Errors that abandon a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The descriptor source could not be read at all.
    #[error("failed to load task descriptors: {0}")]
    Load(#[source] ConfigError),

    /// The load was cancelled or panicked.
    #[error("task descriptor load did not complete: {0}")]
    LoadAborted(#[source] tokio::task::JoinError),

    /// The engine could not be reached.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Descriptors that parsed into tasks.
    pub loaded: usize,
    /// Entries armed in the engine.
    pub registered: usize,
    /// Tasks skipped because `enabled` is false.
    pub disabled: usize,
    /// Descriptor files that failed to parse.
    pub descriptor_failures: usize,
    /// Enabled tasks whose schedule failed to parse.
    pub schedule_failures: usize,
}

/// Rebuilds the engine's entry set from a descriptor source.
pub struct Reconciler {
    source: Arc<dyn DescriptorSource>,
    handle: CronHandle,
    runner: Arc<TaskRunner>,
    metrics: Metrics,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn DescriptorSource>,
        handle: CronHandle,
        runner: Arc<TaskRunner>,
        metrics: Metrics,
    ) -> Self {
        Self {
            source,
            handle,
            runner,
            metrics,
        }
    }

    /// Reconciler reading descriptors from `dir`.
    pub fn for_directory(
        dir: impl Into<std::path::PathBuf>,
        handle: CronHandle,
        runner: Arc<TaskRunner>,
        metrics: Metrics,
    ) -> Self {
        Self::new(Arc::new(DirectoryLoader::new(dir)), handle, runner, metrics)
    }

    pub fn handle(&self) -> &CronHandle {
        &self.handle
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run one reconciliation pass.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, ReconcileError> {
        // Directory walks and file reads block, keep them off the runtime threads
        let source = Arc::clone(&self.source);
        let loaded = match tokio::task::spawn_blocking(move || source.load()).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(ReconcileError::Load(e)),
            Err(e) => Err(ReconcileError::LoadAborted(e)),
        };
        let report = match loaded {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load task descriptors, clearing schedule");
                if let Err(clear_err) = self.handle.clear().await {
                    tracing::warn!(error = %clear_err, "Failed to clear schedule");
                }
                return Err(e);
            }
        };

        let mut summary = ReconcileSummary {
            loaded: report.tasks.len(),
            descriptor_failures: report.failures.len(),
            ..Default::default()
        };

        for failure in &report.failures {
            tracing::error!(
                file = %failure.path.display(),
                error = %failure.error,
                "Failed to parse task descriptor"
            );
            self.metrics.record_yaml_parse_failure(&failure.file_name);
        }

        let mut specs: Vec<EntrySpec> = Vec::new();
        let mut seen = HashSet::new();

        for task in report.tasks {
            if !task.is_enabled() {
                tracing::debug!(task = %task.name(), "Task disabled, not scheduling");
                summary.disabled += 1;
                continue;
            }

            let schedule = match self.handle.parse_schedule(task.schedule()) {
                Ok(schedule) => schedule,
                Err(e) => {
                    tracing::error!(task = %task.name(), error = %e, "Invalid task schedule");
                    self.metrics.record_job_parse_failure(task.name());
                    summary.schedule_failures += 1;
                    continue;
                }
            };

            if !seen.insert(task.name().to_string()) {
                tracing::warn!(
                    task = %task.name(),
                    "Duplicate task name, runs will share output and overlap gate"
                );
            }

            let job: Arc<dyn Job> = Arc::new(TaskJob::new(task, Arc::clone(&self.runner)));
            specs.push((schedule, job));
        }

        let ids = self.handle.replace(specs).await?;
        summary.registered = ids.len();

        tracing::info!(
            loaded = summary.loaded,
            registered = summary.registered,
            disabled = summary.disabled,
            descriptor_failures = summary.descriptor_failures,
            schedule_failures = summary.schedule_failures,
            "Reconciled task schedule"
        );

        Ok(summary)
    }
}
