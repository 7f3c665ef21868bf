//! Background garbage collection.
//!
//! The loop sleeps one interval, sweeps on the blocking pool, and repeats
//! until its [`GcHandle`] is shut down or dropped.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::fs::FsMarkStore;

/// Shortest interval the loop accepts; shorter values are raised to it.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running background collector.
///
/// Dropping the handle stops the loop after any sweep in progress.
#[derive(Debug)]
pub struct GcHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl GcHandle {
    /// Ask the loop to stop without waiting for it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) -> StoreResult<()> {
        self.token.cancel();
        (&mut self.task)
            .await
            .map_err(|e| StoreError::Task(e.to_string()))
    }
}

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl FsMarkStore {
    /// Start a background collector sweeping every configured `gc_interval`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn_gc(&self) -> GcHandle {
        self.spawn_gc_every(self.gc_interval())
    }

    /// Start a background collector with a custom interval.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn_gc_every(&self, interval: Duration) -> GcHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(gc_loop(
            self.clone(),
            interval.max(MIN_INTERVAL),
            token.clone(),
        ));
        GcHandle { token, task }
    }
}

async fn gc_loop(store: FsMarkStore, interval: Duration, token: CancellationToken) {
    info!(root = %store.root().display(), ?interval, "gc loop started");

    // First sweep happens one full interval after start.
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let sweeper = store.clone();
                match tokio::task::spawn_blocking(move || sweeper.gc()).await {
                    Ok(Ok(report)) => debug!(removed = report.total_removed(), "background sweep done"),
                    Ok(Err(e)) => warn!(error = %e, "background sweep failed"),
                    Err(e) => warn!(error = %e, "background sweep task aborted"),
                }
            }
        }
    }

    info!(root = %store.root().display(), "gc loop stopped");
}
