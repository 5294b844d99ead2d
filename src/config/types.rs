//! Configuration type definitions.
//!
//! This module contains the serde shapes of task descriptor files and the
//! optional global configuration file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::ConfigError;

/// One task descriptor file, as written on disk.
///
/// Required fields are optional here so that a missing field surfaces as
/// [`ConfigError::MissingField`] rather than an opaque YAML error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Task name, used for the output directory and metric labels.
    pub task_name: Option<String>,
    /// Cron expression or shortcut.
    pub schedule: Option<String>,
    /// Shell command line.
    pub command: Option<String>,
    /// Comma-separated save-output flags.
    #[serde(default = "default_save_output")]
    pub save_output: String,
    /// Whether the task is armed.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_save_output() -> String {
    "on-success,on-failure".to_string()
}

fn default_true() -> bool {
    true
}

/// What to do when a task comes due while a previous run of it is still
/// executing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Start another run alongside the one in progress.
    #[serde(alias = "allow-overlap")]
    Allow,
    /// Drop the new run.
    #[default]
    #[serde(alias = "skip-if-running")]
    Skip,
    /// Run after the one in progress finishes.
    Queue,
}

impl FromStr for OverlapPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" | "allow-overlap" => Ok(OverlapPolicy::Allow),
            "skip" | "skip-if-running" => Ok(OverlapPolicy::Skip),
            "queue" => Ok(OverlapPolicy::Queue),
            other => Err(ConfigError::InvalidConfig(format!(
                "unknown overlap policy '{}' (expected allow, skip or queue)",
                other
            ))),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverlapPolicy::Allow => "allow",
            OverlapPolicy::Skip => "skip",
            OverlapPolicy::Queue => "queue",
        };
        write!(f, "{}", name)
    }
}

/// Global configuration file (bob.yaml).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Directory holding task descriptor files.
    pub task_directory: Option<PathBuf>,
    /// Root directory for task output.
    pub output_directory: Option<PathBuf>,
    /// Shell used to run commands.
    pub shell: Option<String>,
    /// Port for the health and metrics endpoints.
    pub health_check_port: Option<u16>,
    /// Whether to serve the health and metrics endpoints.
    pub health_check_enabled: Option<bool>,
    /// Overlap policy for all tasks.
    pub overlap_policy: Option<OverlapPolicy>,
    /// Timezone cron expressions are evaluated in.
    pub timezone: Option<String>,
    /// Kill commands that run longer than this many seconds.
    pub command_timeout_secs: Option<u64>,
    /// Window in which bursts of write events are coalesced.
    pub watch_debounce_ms: Option<u64>,
}
