//! Core domain types: tasks, schedules, identifiers and the job callback.

pub mod job;
pub mod schedule;
pub mod task;
pub mod types;
