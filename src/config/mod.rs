//! Configuration loading and parsing.
//!
//! This module provides YAML task descriptors, the optional global
//! configuration file and the runtime [`SchedulerConfig`].

mod error;
mod loader;
mod settings;
mod types;
mod yaml;

pub use error::ConfigError;
pub use loader::{
    DescriptorFailure, DescriptorSource, DirectoryLoader, LoadReport, load_tasks_from_directory,
};
pub use settings::{
    DEFAULT_HEALTH_CHECK_PORT, DEFAULT_OUTPUT_DIRECTORY, DEFAULT_SHELL, DEFAULT_TASK_DIRECTORY,
    DEFAULT_WATCH_DEBOUNCE, SchedulerConfig,
};
pub use types::{GlobalConfig, OverlapPolicy, TaskDescriptor};
pub use yaml::YamlLoader;
