//! Handle for controlling the cron engine.
//!
//! This module provides the `CronHandle` type, the only way to reach the
//! entry set once the engine is started. Every operation is a message to the
//! dispatch loop, so the loop never observes a partially applied change.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::core::job::Job;
use crate::core::schedule::Schedule;
use crate::core::types::EntryId;

use super::types::{EngineCommand, EntrySpec, ScheduleEntry, SchedulerError};

/// Buffer size for the command channel between CronHandle and the engine.
pub(crate) const COMMAND_CHANNEL_BUFFER: usize = 32;

/// Handle for controlling a running cron engine.
#[derive(Clone)]
pub struct CronHandle {
    pub(crate) command_tx: mpsc::Sender<EngineCommand>,
    pub(crate) timezone: Arc<str>,
}

impl CronHandle {
    /// Helper to send a command and wait for its response.
    async fn send_command<T>(
        &self,
        build_command: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
        operation: &str,
    ) -> Result<T, SchedulerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(build_command(response_tx))
            .await
            .map_err(|_| {
                SchedulerError::ChannelError(format!("failed to send {} command", operation))
            })?;

        response_rx.await.map_err(|_| {
            SchedulerError::ChannelError(format!("failed to receive {} response", operation))
        })
    }

    /// Parse `expression` in the engine's timezone.
    pub fn parse_schedule(&self, expression: &str) -> Result<Schedule, SchedulerError> {
        Schedule::with_timezone(expression, &*self.timezone).map_err(|source| {
            SchedulerError::InvalidScheduleExpression {
                expression: expression.to_string(),
                source,
            }
        })
    }

    /// Arm a job on a cron expression.
    pub async fn register(
        &self,
        expression: &str,
        job: Arc<dyn Job>,
    ) -> Result<EntryId, SchedulerError> {
        let schedule = self.parse_schedule(expression)?;
        self.register_schedule(schedule, job).await
    }

    /// Arm a job on an already parsed schedule.
    pub async fn register_schedule(
        &self,
        schedule: Schedule,
        job: Arc<dyn Job>,
    ) -> Result<EntryId, SchedulerError> {
        self.send_command(
            |response| EngineCommand::Register {
                schedule,
                job,
                response,
            },
            "register",
        )
        .await
    }

    /// Disarm an entry. Returns `false` if no such entry existed.
    pub async fn remove(&self, id: EntryId) -> Result<bool, SchedulerError> {
        self.send_command(|response| EngineCommand::Remove { id, response }, "remove")
            .await
    }

    /// Snapshot of all armed entries, ordered by id.
    pub async fn entries(&self) -> Result<Vec<ScheduleEntry>, SchedulerError> {
        self.send_command(|response| EngineCommand::Entries { response }, "entries")
            .await
    }

    /// Remove every entry and arm `entries` instead, as one step.
    ///
    /// Runs that are already executing are left alone.
    pub async fn replace(&self, entries: Vec<EntrySpec>) -> Result<Vec<EntryId>, SchedulerError> {
        self.send_command(
            |response| EngineCommand::Replace { entries, response },
            "replace",
        )
        .await
    }

    /// Remove every entry.
    pub async fn clear(&self) -> Result<(), SchedulerError> {
        self.replace(Vec::new()).await.map(|_| ())
    }

    /// Stop the dispatch loop. In-flight runs are not waited for.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.send_command(|response| EngineCommand::Shutdown { response }, "shutdown")
            .await
    }

    /// Check if the dispatch loop is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.command_tx.is_closed()
    }

    /// Timezone schedules are evaluated in.
    pub fn timezone(&self) -> &str {
        &self.timezone
    }
}
