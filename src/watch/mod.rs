//! Keeping the live schedule in step with the task directory.

mod reconciler;
mod watcher;

pub use reconciler::{ReconcileError, ReconcileSummary, Reconciler};
pub use watcher::{DirectoryWatcher, WatchError, is_write_event, watch_and_reconcile};
