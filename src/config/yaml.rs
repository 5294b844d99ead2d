//! YAML configuration parsing.
//!
//! Parses task descriptors and the global configuration from YAML.

use std::path::Path;

use crate::core::task::{SaveOutput, Task, is_valid_task_name};

use super::error::ConfigError;
use super::types::{GlobalConfig, TaskDescriptor};

/// YAML configuration loader.
pub struct YamlLoader;

impl YamlLoader {
    /// Load global configuration from a file.
    pub fn load_global_config(path: impl AsRef<Path>) -> Result<GlobalConfig, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::FileReadError {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::parse_global_config(&content).map_err(|e| e.in_file(path))
    }

    /// Parse global configuration from a YAML string.
    pub fn parse_global_config(yaml: &str) -> Result<GlobalConfig, ConfigError> {
        let config: GlobalConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load a task from a descriptor file.
    pub fn load_task(path: impl AsRef<Path>) -> Result<Task, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::FileReadError {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let task = Self::parse_task(&content).map_err(|e| e.in_file(path))?;
        Ok(task.with_source(path))
    }

    /// Parse a task from a descriptor YAML string.
    pub fn parse_task(yaml: &str) -> Result<Task, ConfigError> {
        let descriptor: TaskDescriptor = serde_yaml::from_str(yaml)?;
        Self::build_task(descriptor)
    }

    /// Validate a descriptor and convert it into a task.
    fn build_task(descriptor: TaskDescriptor) -> Result<Task, ConfigError> {
        let task_name = Self::required(descriptor.task_name, "task_name")?;
        if !is_valid_task_name(&task_name) {
            return Err(ConfigError::InvalidTaskName(task_name));
        }
        let schedule = Self::required(descriptor.schedule, "schedule")?;
        let command = Self::required(descriptor.command, "command")?;
        let save_output = SaveOutput::parse(&descriptor.save_output)?;

        Ok(Task::new(task_name, schedule, command)
            .with_save_output(save_output)
            .with_enabled(descriptor.enabled))
    }

    /// A required field must be present and not blank.
    fn required(value: Option<String>, field: &str) -> Result<String, ConfigError> {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField(field.to_string()))
    }
}
