//! Cron engine implementation.
//!
//! The engine is a single task that owns every schedule entry. It:
//! - Sleeps until the earliest entry is due
//! - Fires each due entry on its own tokio task without waiting for it
//! - Recomputes the entry's next fire time from the moment it fired
//! - Applies register/remove/replace commands between dispatch rounds
//!
//! Because nothing else can touch the entry set, a dispatch round always sees
//! either the whole entry set from before a `replace` or the whole set after it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::job::Job;
use crate::core::schedule::Schedule;
use crate::core::types::EntryId;

use super::handle::{COMMAND_CHANNEL_BUFFER, CronHandle};
use super::types::{EngineCommand, EntrySpec, ScheduleEntry};

/// How long to sleep when no entry is armed.
const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(60);

/// An armed entry, owned by the dispatch loop.
struct Entry {
    id: EntryId,
    schedule: Schedule,
    job: Arc<dyn Job>,
    next_fire: Option<DateTime<Utc>>,
    prev_fire: Option<DateTime<Utc>>,
}

impl Entry {
    fn snapshot(&self) -> ScheduleEntry {
        ScheduleEntry {
            id: self.id,
            task: self.job.task().clone(),
            expression: self.schedule.expression().to_string(),
            next_fire: self.next_fire,
            prev_fire: self.prev_fire,
        }
    }
}

/// Entry set plus the id counter. Only the dispatch loop holds this.
struct EntryTable {
    entries: BTreeMap<EntryId, Entry>,
    next_id: u64,
}

impl EntryTable {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, schedule: Schedule, job: Arc<dyn Job>, now: DateTime<Utc>) -> EntryId {
        let id = EntryId::new(self.next_id);
        self.next_id += 1;

        let next_fire = schedule.next_after(now).ok();
        tracing::debug!(
            entry_id = %id,
            task = %job.task().name(),
            schedule = %schedule.expression(),
            next_fire = ?next_fire,
            "Armed schedule entry"
        );

        self.entries.insert(
            id,
            Entry {
                id,
                schedule,
                job,
                next_fire,
                prev_fire: None,
            },
        );
        id
    }

    fn remove(&mut self, id: EntryId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                tracing::debug!(entry_id = %id, task = %entry.job.task().name(), "Removed schedule entry");
                true
            }
            None => false,
        }
    }

    fn replace(&mut self, specs: Vec<EntrySpec>, now: DateTime<Utc>) -> Vec<EntryId> {
        let ids: Vec<EntryId> = self.entries.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }

        specs
            .into_iter()
            .map(|(schedule, job)| self.insert(schedule, job, now))
            .collect()
    }

    fn earliest_fire(&self) -> Option<DateTime<Utc>> {
        self.entries.values().filter_map(|e| e.next_fire).min()
    }

    /// Fire every entry due at `now`. Order across entries is not defined.
    fn fire_due(&mut self, now: DateTime<Utc>) -> usize {
        let mut fired = 0;

        for entry in self.entries.values_mut() {
            let Some(due) = entry.next_fire else {
                continue;
            };
            if due > now {
                continue;
            }

            tracing::debug!(entry_id = %entry.id, task = %entry.job.task().name(), "Firing schedule entry");
            let job = Arc::clone(&entry.job);
            tokio::spawn(async move {
                job.run().await;
            });
            fired += 1;

            entry.prev_fire = Some(due);
            entry.next_fire = entry.schedule.next_after(now).ok();
            if entry.next_fire.is_none() {
                tracing::info!(
                    entry_id = %entry.id,
                    task = %entry.job.task().name(),
                    "Schedule has no further occurrences"
                );
            }
        }

        fired
    }
}

/// Cron engine: owns schedule entries and fires their jobs when due.
pub struct CronEngine {
    /// Timezone schedules registered by expression are parsed in.
    timezone: String,
    /// Sleep length when no entry is armed.
    idle_interval: Duration,
}

impl Default for CronEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CronEngine {
    /// Create an engine evaluating schedules in UTC.
    pub fn new() -> Self {
        Self {
            timezone: "UTC".to_string(),
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }

    /// Set the timezone for schedules registered through the handle.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Set how long to sleep when nothing is armed.
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Start the dispatch loop and return a handle for controlling it.
    pub fn start(self) -> (CronHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_BUFFER);

        let handle = CronHandle {
            command_tx,
            timezone: Arc::from(self.timezone.as_str()),
        };

        let task = tokio::spawn(async move {
            self.run(command_rx).await;
        });

        (handle, task)
    }

    /// Main dispatch loop.
    async fn run(self, mut command_rx: mpsc::Receiver<EngineCommand>) {
        let mut table = EntryTable::new();
        tracing::debug!(timezone = %self.timezone, "Cron engine started");

        loop {
            let sleep_for = match table.earliest_fire() {
                Some(next) => (next - Utc::now()).to_std().unwrap_or(Duration::ZERO),
                None => self.idle_interval,
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {
                    table.fire_due(Utc::now());
                }

                command = command_rx.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("All cron handles dropped, stopping engine");
                        break;
                    };

                    match command {
                        EngineCommand::Register { schedule, job, response } => {
                            let id = table.insert(schedule, job, Utc::now());
                            let _ = response.send(id);
                        }
                        EngineCommand::Remove { id, response } => {
                            let _ = response.send(table.remove(id));
                        }
                        EngineCommand::Entries { response } => {
                            let entries = table.entries.values().map(Entry::snapshot).collect();
                            let _ = response.send(entries);
                        }
                        EngineCommand::Replace { entries, response } => {
                            let ids = table.replace(entries, Utc::now());
                            let _ = response.send(ids);
                        }
                        EngineCommand::Shutdown { response } => {
                            tracing::info!(entries = table.entries.len(), "Cron engine shutting down");
                            let _ = response.send(());
                            break;
                        }
                    }
                }
            }
        }
    }
}
