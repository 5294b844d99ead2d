//! bob - a declarative, file-driven cron task scheduler.
//!
//! Tasks are YAML files in a directory. Each one names a cron schedule and a
//! shell command. The scheduler keeps its live schedule in step with the
//! directory, runs commands when they come due and records every run under
//! an output directory.

pub mod api;
pub mod config;
pub mod core;
pub mod execution;
pub mod metrics;
pub mod scheduler;
pub mod watch;

pub use config::{
    ConfigError, DescriptorFailure, DescriptorSource, DirectoryLoader, GlobalConfig, LoadReport,
    OverlapPolicy, SchedulerConfig, TaskDescriptor, YamlLoader, load_tasks_from_directory,
};
pub use core::job::Job;
pub use core::schedule::{Schedule, ScheduleError};
pub use core::task::{SaveOn, SaveOutput, Task, TaskError};
pub use core::types::{EntryId, RunId};
pub use execution::{
    CommandExecutor, CommandOutput, ExecutionOutcome, ExecutionRecord, Marker, OutputStore,
    ShellExecutor, TaskJob, TaskRunner,
};
pub use metrics::Metrics;
pub use scheduler::{CronEngine, CronHandle, EntrySpec, ScheduleEntry, SchedulerError};
pub use watch::{
    DirectoryWatcher, ReconcileError, ReconcileSummary, Reconciler, WatchError,
    watch_and_reconcile,
};
