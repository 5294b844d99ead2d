//! API response types.

use std::fmt;

/// Body of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    /// Armed schedule entries.
    pub tasks: usize,
    /// Executions in flight.
    pub running: usize,
    /// Processes on the host, if they could be counted.
    pub processes: Option<usize>,
}

impl fmt::Display for HealthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tasks: {}", self.tasks)?;
        writeln!(f, "running: {}", self.running)?;
        match self.processes {
            Some(count) => writeln!(f, "processes: {}", count),
            None => writeln!(f, "processes: N/A"),
        }
    }
}
