//! Job trait: the callback a schedule entry fires.
//!
//! The cron engine knows nothing about shells or output directories. It
//! holds an `Arc<dyn Job>` per entry and calls [`Job::run`] on a fresh tokio
//! task each time the entry is due.

use async_trait::async_trait;

use super::task::Task;

/// A unit of work bound to a schedule entry.
///
/// Implementations must own everything they need to run. In particular the
/// [`Task`] they expose is a snapshot taken when the entry was registered,
/// not a reference into shared, mutable state.
///
/// # Example
///
/// ```ignore
/// use bob::{Job, Task};
/// use async_trait::async_trait;
///
/// struct Ping {
///     task: Task,
/// }
///
/// #[async_trait]
/// impl Job for Ping {
///     fn task(&self) -> &Task {
///         &self.task
///     }
///
///     async fn run(&self) {
///         tracing::info!(task = %self.task.name(), "ping");
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync {
    /// The task this job was built from.
    fn task(&self) -> &Task;

    /// Run the job once. Failures are the job's own concern.
    async fn run(&self);
}
