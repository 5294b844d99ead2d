//! Per-task markers and output artifacts.
//!
//! Layout under the output root:
//!
//! ```text
//! <root>/<task_name>/last-start
//! <root>/<task_name>/last-success
//! <root>/<task_name>/last-failure
//! <root>/<task_name>/stdout-<unix>.started
//! <root>/<task_name>/stdout-<unix>.succeeded
//! <root>/<task_name>/stdout-<unix>.failed
//! ```
//!
//! Every write is best-effort. Failures are logged and never reach the caller.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};

use crate::core::task::is_valid_task_name;

/// Timestamp format used inside markers and artifacts.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

/// Which lifecycle point a marker records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    Success,
    Failure,
}

impl Marker {
    pub fn file_name(self) -> &'static str {
        match self {
            Marker::Start => "last-start",
            Marker::Success => "last-success",
            Marker::Failure => "last-failure",
        }
    }

    fn artifact_suffix(self) -> &'static str {
        match self {
            Marker::Start => "started",
            Marker::Success => "succeeded",
            Marker::Failure => "failed",
        }
    }
}

/// Render a timestamp the way markers and artifacts show it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
}

/// Writes markers and artifacts under an output root.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one task's files.
    pub fn task_dir(&self, task_name: &str) -> PathBuf {
        self.root.join(task_name)
    }

    /// Path of the artifact for `marker` at `at`.
    pub fn artifact_path(&self, task_name: &str, marker: Marker, at: DateTime<Utc>) -> PathBuf {
        self.task_dir(task_name).join(format!(
            "stdout-{}.{}",
            at.timestamp(),
            marker.artifact_suffix()
        ))
    }

    /// Overwrite the `marker` file with the formatted timestamp.
    pub fn write_marker(&self, task_name: &str, marker: Marker, at: DateTime<Utc>) {
        let path = self.task_dir(task_name).join(marker.file_name());
        if let Err(e) = self.write_file(task_name, &path, &format_timestamp(at)) {
            tracing::warn!(
                task = %task_name,
                path = %path.display(),
                error = %e,
                "Failed to write marker"
            );
        }
    }

    /// Persist an artifact: a timestamp line followed by `body`.
    ///
    /// Returns the path written, or `None` if the write failed.
    pub fn write_artifact(
        &self,
        task_name: &str,
        marker: Marker,
        at: DateTime<Utc>,
        body: &str,
    ) -> Option<PathBuf> {
        let path = self.artifact_path(task_name, marker, at);
        let contents = format!("{}\n{}", format_timestamp(at), body);

        match self.write_file(task_name, &path, &contents) {
            Ok(()) => {
                tracing::debug!(task = %task_name, path = %path.display(), "Saved output artifact");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(
                    task = %task_name,
                    path = %path.display(),
                    error = %e,
                    "Failed to save output artifact"
                );
                None
            }
        }
    }

    fn write_file(&self, task_name: &str, path: &Path, contents: &str) -> io::Result<()> {
        if !is_valid_task_name(task_name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "task name is not a single path component",
            ));
        }
        std::fs::create_dir_all(self.task_dir(task_name))?;
        std::fs::write(path, contents)
    }
}
