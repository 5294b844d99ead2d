//! Runtime settings for a scheduler process.
//!
//! [`SchedulerConfig`] is built once at startup (defaults, then the optional
//! global config file, then command-line flags) and shared by reference with
//! every component.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use super::error::ConfigError;
use super::types::{GlobalConfig, OverlapPolicy};

/// Default descriptor directory.
pub const DEFAULT_TASK_DIRECTORY: &str = "./example-tasks";

/// Default output root.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "/var/spool/bob-the-scheduler";

/// Default shell.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Default health-check port.
pub const DEFAULT_HEALTH_CHECK_PORT: u16 = 8000;

/// Default window for coalescing directory events.
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Process-wide scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Directory holding task descriptor files.
    pub task_directory: PathBuf,
    /// Root directory for per-task output.
    pub output_directory: PathBuf,
    /// Shell used as `<shell> -c <command>`.
    pub shell: String,
    /// Port for the health and metrics endpoints.
    pub health_check_port: u16,
    /// Whether to serve the health and metrics endpoints.
    pub health_check_enabled: bool,
    /// Log at debug level.
    pub verbose: bool,
    /// Overlap policy for all tasks.
    pub overlap_policy: OverlapPolicy,
    /// Timezone cron expressions are evaluated in.
    pub timezone: String,
    /// Kill commands that run longer than this.
    pub command_timeout: Option<Duration>,
    /// Window in which bursts of write events are coalesced.
    pub watch_debounce: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            task_directory: PathBuf::from(DEFAULT_TASK_DIRECTORY),
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            shell: DEFAULT_SHELL.to_string(),
            health_check_port: DEFAULT_HEALTH_CHECK_PORT,
            health_check_enabled: true,
            verbose: false,
            overlap_policy: OverlapPolicy::default(),
            timezone: "UTC".to_string(),
            command_timeout: None,
            watch_debounce: DEFAULT_WATCH_DEBOUNCE,
        }
    }
}

impl SchedulerConfig {
    /// Create a config with the given task and output directories.
    pub fn new(task_directory: impl Into<PathBuf>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            task_directory: task_directory.into(),
            output_directory: output_directory.into(),
            ..Self::default()
        }
    }

    /// Set the shell.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Set the overlap policy.
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    /// Set the schedule timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Set the command timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Set the watch debounce window.
    pub fn with_watch_debounce(mut self, debounce: Duration) -> Self {
        self.watch_debounce = debounce;
        self
    }

    /// Overlay values present in a global config file.
    pub fn apply_global(&mut self, global: GlobalConfig) {
        if let Some(dir) = global.task_directory {
            self.task_directory = dir;
        }
        if let Some(dir) = global.output_directory {
            self.output_directory = dir;
        }
        if let Some(shell) = global.shell {
            self.shell = shell;
        }
        if let Some(port) = global.health_check_port {
            self.health_check_port = port;
        }
        if let Some(enabled) = global.health_check_enabled {
            self.health_check_enabled = enabled;
        }
        if let Some(policy) = global.overlap_policy {
            self.overlap_policy = policy;
        }
        if let Some(tz) = global.timezone {
            self.timezone = tz;
        }
        if let Some(secs) = global.command_timeout_secs {
            self.command_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(ms) = global.watch_debounce_ms {
            self.watch_debounce = Duration::from_millis(ms);
        }
    }

    /// Check values that would otherwise only fail at first use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidConfig(format!("unknown timezone '{}'", self.timezone)))?;

        if self.shell.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("shell cannot be empty".into()));
        }

        if self.command_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidConfig(
                "command timeout cannot be zero".into(),
            ));
        }

        Ok(())
    }

    /// Address the health and metrics endpoints bind to.
    pub fn health_check_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.health_check_port))
    }
}
