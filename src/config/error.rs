//! Configuration error types.
//!
//! This module defines error types for descriptor loading and global
//! configuration.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::task::TaskError;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a specific file with context.
    #[error("failed to read file '{path}': {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a directory with context.
    #[error("failed to read directory '{path}': {source}")]
    DirReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The descriptor root exists but is not a directory.
    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),

    /// Failed to parse YAML.
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Failed to parse YAML from a specific file.
    #[error("YAML parse error in '{path}': {source}")]
    YamlFileError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Missing or empty required field.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// The task name cannot be used as an output directory name.
    #[error("invalid task_name '{0}': must be a plain name without path separators")]
    InvalidTaskName(String),

    /// Invalid save_output policy.
    #[error("invalid save_output: {0}")]
    InvalidSaveOutput(#[from] TaskError),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConfigError {
    /// Attach a file path to an error produced while parsing that file.
    pub(crate) fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            ConfigError::YamlError(source) => ConfigError::YamlFileError {
                path: path.into(),
                source,
            },
            other => other,
        }
    }
}
