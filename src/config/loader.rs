//! Descriptor discovery.
//!
//! Walks the task directory, parses every `.yml`/`.yaml` file and reports the
//! valid tasks alongside the files that were rejected.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::task::Task;

use super::error::ConfigError;
use super::yaml::YamlLoader;

/// A descriptor file that could not be turned into a task.
#[derive(Debug)]
pub struct DescriptorFailure {
    /// Base name of the file, used as the metric label.
    pub file_name: String,
    /// Full path of the file.
    pub path: PathBuf,
    /// Why it was rejected.
    pub error: ConfigError,
}

/// Result of one load: valid tasks in discovery order, plus rejected files.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub tasks: Vec<Task>,
    pub failures: Vec<DescriptorFailure>,
}

impl LoadReport {
    /// Tasks that should be armed.
    pub fn enabled(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| task.is_enabled())
    }
}

/// A source of task descriptors.
///
/// A single bad descriptor never fails a load; it is reported in
/// [`LoadReport::failures`]. Only failing to enumerate the source at all is an
/// error.
pub trait DescriptorSource: Send + Sync {
    /// Load every descriptor currently present.
    fn load(&self) -> Result<LoadReport, ConfigError>;
}

/// Loads descriptors from a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    /// Create a loader rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory being loaded.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DescriptorSource for DirectoryLoader {
    fn load(&self) -> Result<LoadReport, ConfigError> {
        load_tasks_from_directory(&self.dir)
    }
}

fn is_descriptor(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    )
}

/// Load all task descriptors under a directory, recursively.
///
/// Files are visited in file-name order within each directory.
pub fn load_tasks_from_directory(dir: impl AsRef<Path>) -> Result<LoadReport, ConfigError> {
    let dir = dir.as_ref();

    let metadata = std::fs::metadata(dir).map_err(|source| ConfigError::DirReadError {
        path: dir.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ConfigError::NotADirectory(dir.to_path_buf()));
    }

    let mut report = LoadReport::default();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ConfigError::DirReadError {
                    path: dir.to_path_buf(),
                    source: e.into(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable entry in task directory");
                continue;
            }
        };

        // Symlinked descriptors are read through the link
        if entry.file_type().is_dir() || !is_descriptor(entry.path()) {
            continue;
        }

        let path = entry.path();
        match YamlLoader::load_task(path) {
            Ok(task) => report.tasks.push(task),
            Err(error) => report.failures.push(DescriptorFailure {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                path: path.to_path_buf(),
                error,
            }),
        }
    }

    Ok(report)
}
