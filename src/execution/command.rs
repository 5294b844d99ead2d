//! Shell command execution.
//!
//! [`ShellExecutor`] runs a task's command line through a shell
//! (`<shell> -c <command>`), capturing stdout and stderr together so the saved
//! artifact reads the way a terminal would have shown it.
//!
//! The [`CommandExecutor`] trait is the seam the runner depends on, which lets
//! tests substitute a scripted executor.
//!
//! # Timeouts
//!
//! With a timeout configured, an overrun is reported as a failed run. The child
//! is killed when the command future is dropped, so the process gets no chance
//! to clean up.
//!
//! ```ignore
//! let executor = ShellExecutor::new("/bin/sh").with_timeout(Duration::from_secs(30));
//! let output = executor.run("echo hi").await;
//! assert!(output.success);
//! assert_eq!(output.output, "hi\n");
//! ```

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Result of running one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Combined stdout and stderr.
    pub output: String,
    /// Failure detail, `None` on success.
    pub error: Option<String>,
    /// Exit code, `None` if the process never exited normally.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// A successful run with the given output.
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            exit_code: Some(0),
        }
    }

    /// A failed run with an error description.
    pub fn failed(error: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: Some(error.into()),
            exit_code: None,
        }
    }
}

/// Something that can run a task's command line.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion. Failure is reported in the output, never
    /// as an error.
    async fn run(&self, command: &str) -> CommandOutput;
}

/// Runs commands as `<shell> -c <command>`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: PathBuf,
    timeout: Option<Duration>,
}

impl ShellExecutor {
    /// Create an executor using `shell`, with no timeout.
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            timeout: None,
        }
    }

    /// Fail runs that take longer than `duration`.
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Get the shell path.
    pub fn shell(&self) -> &PathBuf {
        &self.shell
    }

    /// Get the timeout duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn build_command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        // Redirect stderr into stdout inside the shell so both streams keep
        // their relative order in the captured text.
        cmd.arg("-c").arg(format!("exec 2>&1; {}", command));
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn run(&self, command: &str) -> CommandOutput {
        let child = self.build_command(command).output();

        let result = match self.timeout {
            Some(duration) => match timeout(duration, child).await {
                Ok(result) => result,
                Err(_) => {
                    return CommandOutput::failed(
                        format!("command timed out after {:?}", duration),
                        String::new(),
                    );
                }
            },
            None => child.await,
        };

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                return CommandOutput::failed(
                    format!("failed to execute {}: {}", self.shell.display(), e),
                    String::new(),
                );
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        let code = output.status.code();
        if output.status.success() {
            CommandOutput {
                success: true,
                output: text,
                error: None,
                exit_code: code,
            }
        } else {
            let error = match code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            CommandOutput {
                success: false,
                output: text,
                error: Some(error),
                exit_code: code,
            }
        }
    }
}
