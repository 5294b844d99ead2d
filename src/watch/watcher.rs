//! Directory watching.
//!
//! [`DirectoryWatcher`] arms a non-recursive `notify` watch on the task
//! directory and forwards raw events into a tokio channel. Only write events
//! count as triggers; each burst of them is coalesced into one trigger.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

use super::reconciler::Reconciler;

/// A burst is cut off after this many debounce windows, so steady writes
/// still produce a pass.
const MAX_COALESCE_WINDOWS: u32 = 10;

/// Errors arming the directory watch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch task directory: {0}")]
    Notify(#[from] notify::Error),
}

/// Whether an event should trigger a reconciliation pass.
///
/// Creates and removes are not delivered distinctly on every platform, so
/// only content writes are used.
pub fn is_write_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}

/// A live watch on one directory.
pub struct DirectoryWatcher {
    // Dropping the watcher stops event delivery.
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    dir: PathBuf,
}

impl DirectoryWatcher {
    /// Start watching `dir` (not its subdirectories).
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, WatchError> {
        let dir = dir.into();
        let (tx, events) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            // Receiver gone means the watch loop has stopped.
            let _ = tx.send(event);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = %dir.display(), "Watching task directory");
        Ok(Self {
            _watcher: watcher,
            events,
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Wait for the next write event, then swallow whatever else arrives until
    /// the directory has been quiet for `debounce`.
    ///
    /// Coalescing stops after `debounce * MAX_COALESCE_WINDOWS` even if
    /// events keep arriving.
    ///
    /// Returns `false` once no more events can arrive.
    pub async fn next_trigger(&mut self, debounce: Duration) -> bool {
        loop {
            match self.events.recv().await {
                None => return false,
                Some(Ok(event)) if is_write_event(&event.kind) => {
                    tracing::debug!(paths = ?event.paths, "Task directory changed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Directory watch error");
                }
            }
        }

        let deadline = tokio::time::Instant::now() + debounce * MAX_COALESCE_WINDOWS;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                tracing::debug!("Task directory still changing, reconciling anyway");
                break;
            }
            match tokio::time::timeout(debounce.min(remaining), self.events.recv()).await {
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
        true
    }
}

/// Reconcile once, then again after every burst of writes to the directory.
///
/// Runs until the watcher stops delivering events.
pub async fn watch_and_reconcile(
    mut watcher: DirectoryWatcher,
    reconciler: Arc<Reconciler>,
    debounce: Duration,
) {
    if let Err(e) = reconciler.reconcile().await {
        tracing::error!(error = %e, "Initial reconciliation failed");
    }

    while watcher.next_trigger(debounce).await {
        if let Err(e) = reconciler.reconcile().await {
            tracing::error!(error = %e, "Reconciliation failed");
        }
    }

    tracing::info!(dir = %watcher.dir().display(), "Directory watch ended");
}
