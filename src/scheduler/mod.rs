//! Cron scheduling engine.
//!
//! This module provides the dispatch loop that owns every schedule entry,
//! computes next fire times and fires jobs when they come due.

mod engine;
mod handle;
mod types;

pub use engine::CronEngine;
pub use handle::CronHandle;
pub use types::{EntrySpec, ScheduleEntry, SchedulerError};
