//! Task records and save-output policy.
//!
//! A [`Task`] is the immutable, validated form of one descriptor file. It is
//! rebuilt from disk on every reconciliation pass and never mutated in place.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when building task records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// A `save_output` token is not one of the known flags.
    #[error("unknown save_output flag '{0}' (expected on-start, on-success or on-failure)")]
    UnknownSaveFlag(String),
}

/// Whether `name` can be used as a task's output directory name.
///
/// The name must be exactly one normal path component, so it always resolves
/// to a directory directly under the output root.
pub fn is_valid_task_name(name: &str) -> bool {
    if name.trim().is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// A point in a task's lifecycle at which output may be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveOn {
    /// When the run begins.
    OnStart,
    /// When the command exits successfully.
    OnSuccess,
    /// When the command fails.
    OnFailure,
}

impl SaveOn {
    /// The descriptor spelling of this flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveOn::OnStart => "on-start",
            SaveOn::OnSuccess => "on-success",
            SaveOn::OnFailure => "on-failure",
        }
    }
}

impl FromStr for SaveOn {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "on-start" => Ok(SaveOn::OnStart),
            "on-success" => Ok(SaveOn::OnSuccess),
            "on-failure" => Ok(SaveOn::OnFailure),
            other => Err(TaskError::UnknownSaveFlag(other.to_string())),
        }
    }
}

/// The set of lifecycle points whose output is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutput {
    on_start: bool,
    on_success: bool,
    on_failure: bool,
}

impl SaveOutput {
    /// A policy that saves nothing.
    pub fn none() -> Self {
        Self {
            on_start: false,
            on_success: false,
            on_failure: false,
        }
    }

    /// Add a flag to the policy.
    pub fn with(mut self, flag: SaveOn) -> Self {
        match flag {
            SaveOn::OnStart => self.on_start = true,
            SaveOn::OnSuccess => self.on_success = true,
            SaveOn::OnFailure => self.on_failure = true,
        }
        self
    }

    /// Check whether the policy includes a flag.
    pub fn contains(&self, flag: SaveOn) -> bool {
        match flag {
            SaveOn::OnStart => self.on_start,
            SaveOn::OnSuccess => self.on_success,
            SaveOn::OnFailure => self.on_failure,
        }
    }

    /// Parse a comma-separated flag list such as `on-success,on-failure`.
    ///
    /// Blank entries are ignored, so an empty string yields a policy that
    /// saves nothing.
    pub fn parse(list: &str) -> Result<Self, TaskError> {
        list.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .try_fold(Self::none(), |policy, token| {
                token.parse::<SaveOn>().map(|flag| policy.with(flag))
            })
    }
}

impl Default for SaveOutput {
    fn default() -> Self {
        Self::none().with(SaveOn::OnSuccess).with(SaveOn::OnFailure)
    }
}

impl FromStr for SaveOutput {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SaveOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags: Vec<&str> = [SaveOn::OnStart, SaveOn::OnSuccess, SaveOn::OnFailure]
            .into_iter()
            .filter(|flag| self.contains(*flag))
            .map(|flag| flag.as_str())
            .collect();
        write!(f, "{}", flags.join(","))
    }
}

/// A scheduled shell command declared by one descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    name: String,
    schedule: String,
    command: String,
    save_output: SaveOutput,
    enabled: bool,
    source: Option<PathBuf>,
}

impl Task {
    /// Create an enabled task with the default save-output policy.
    pub fn new(
        name: impl Into<String>,
        schedule: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            command: command.into(),
            save_output: SaveOutput::default(),
            enabled: true,
            source: None,
        }
    }

    /// Set the save-output policy.
    pub fn with_save_output(mut self, save_output: SaveOutput) -> Self {
        self.save_output = save_output;
        self
    }

    /// Set whether the task is armed by the scheduler.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Record the descriptor file this task was loaded from.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the schedule expression.
    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Get the shell command line.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Get the save-output policy.
    pub fn save_output(&self) -> SaveOutput {
        self.save_output
    }

    /// Check if the task is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the descriptor file path, if known.
    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }
}
