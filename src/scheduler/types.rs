//! Scheduler type definitions.
//!
//! This module contains the error type, the entry snapshot handed to callers
//! and the command type the handle sends to the dispatch loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::core::job::Job;
use crate::core::schedule::{Schedule, ScheduleError};
use crate::core::task::Task;
use crate::core::types::EntryId;

/// Errors that can occur in the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron expression could not be parsed.
    #[error("invalid schedule expression '{expression}': {source}")]
    InvalidScheduleExpression {
        expression: String,
        #[source]
        source: ScheduleError,
    },

    /// Channel error.
    #[error("channel error: {0}")]
    ChannelError(String),
}

/// Point-in-time view of one armed entry.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// Snapshot of the task the entry was registered for.
    pub task: Task,
    /// Schedule expression as written.
    pub expression: String,
    /// When the entry fires next; `None` once the schedule is exhausted.
    pub next_fire: Option<DateTime<Utc>>,
    /// When the entry last fired.
    pub prev_fire: Option<DateTime<Utc>>,
}

/// A schedule paired with the job it fires.
pub type EntrySpec = (Schedule, Arc<dyn Job>);

/// Commands that can be sent to the dispatch loop.
pub(crate) enum EngineCommand {
    /// Arm a new entry.
    Register {
        schedule: Schedule,
        job: Arc<dyn Job>,
        response: oneshot::Sender<EntryId>,
    },
    /// Disarm an entry.
    Remove {
        id: EntryId,
        response: oneshot::Sender<bool>,
    },
    /// Snapshot all entries.
    Entries {
        response: oneshot::Sender<Vec<ScheduleEntry>>,
    },
    /// Remove every entry and arm a new set in one step.
    Replace {
        entries: Vec<EntrySpec>,
        response: oneshot::Sender<Vec<EntryId>>,
    },
    /// Stop dispatching.
    Shutdown { response: oneshot::Sender<()> },
}
