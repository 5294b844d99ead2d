//! Task execution.
//!
//! Shell command running, per-task output persistence and the lifecycle
//! runner that ties them together.

mod command;
mod output;
mod runner;

pub use command::{CommandExecutor, CommandOutput, ShellExecutor};
pub use output::{Marker, OutputStore, TIMESTAMP_FORMAT, format_timestamp};
pub use runner::{ExecutionOutcome, ExecutionRecord, TaskJob, TaskRunner};
