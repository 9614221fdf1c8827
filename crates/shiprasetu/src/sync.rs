//! Polling synchronizer.
//!
//! Other processes sharing the database write to the same keys. The
//! synchronizer re-reads all four collections on a fixed interval and
//! replaces memory with whatever storage holds, so every context converges
//! on the last write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::state::SharedState;
use crate::storage::CollectionKey;

/// Collections that changed during one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    /// Collections whose in-memory contents were replaced.
    pub changed: Vec<CollectionKey>,
    /// When the poll ran.
    pub at: DateTime<Utc>,
}

/// Counters for a synchronizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Polls completed.
    pub ticks: u64,
    /// Collections reloaded because their contents changed.
    pub changes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    changes: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SyncStats {
        SyncStats {
            ticks: self.ticks.load(Ordering::SeqCst),
            changes: self.changes.load(Ordering::SeqCst),
        }
    }
}

/// Re-reads storage into a [`SharedState`].
#[derive(Debug)]
pub struct Synchronizer {
    state: SharedState,
    period: Duration,
    events: Option<mpsc::Sender<SyncEvent>>,
    counters: Arc<Counters>,
}

impl Synchronizer {
    /// Create a synchronizer for `state` polling every `period`.
    #[must_use]
    pub fn new(state: SharedState, period: Duration) -> Self {
        Self {
            state,
            period,
            events: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Start polling `state` in the background.
    #[must_use]
    pub fn spawn(state: SharedState, period: Duration) -> SyncHandle {
        Self::new(state, period).start()
    }

    /// Send a [`SyncEvent`] on `tx` after every poll that changed something.
    #[must_use]
    pub fn with_events(mut self, tx: mpsc::Sender<SyncEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    /// Run one poll now.
    ///
    /// Reloads all four collections, retrying any with unsaved changes
    /// first. Returns the collections whose in-memory contents changed.
    pub fn tick(&mut self) -> Vec<CollectionKey> {
        trace!("Polling storage");
        let changed = self.state.poll_reload(&CollectionKey::ALL);

        self.counters.ticks.fetch_add(1, Ordering::SeqCst);
        self.counters
            .changes
            .fetch_add(changed.len() as u64, Ordering::SeqCst);
        if !changed.is_empty() {
            info!(?changed, "Picked up external changes");
        }
        changed
    }

    /// Start polling in a background task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(self) -> SyncHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::clone(&self.counters);
        let task = tokio::spawn(self.run(shutdown_rx));
        SyncHandle {
            shutdown: shutdown_tx,
            task: Some(task),
            counters,
        }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.period.as_millis(),
            "Starting storage synchronizer"
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let changed = self.tick();
                    if changed.is_empty() {
                        continue;
                    }
                    if let Some(tx) = &self.events {
                        let event = SyncEvent { changed, at: Utc::now() };
                        if tx.send(event).await.is_err() {
                            debug!("Sync event channel closed, no longer reporting");
                            self.events = None;
                        }
                    }
                }
            }
        }

        debug!("Storage synchronizer stopped");
    }
}

/// Controls a running [`Synchronizer`].
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl SyncHandle {
    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    /// Check if the task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop polling and wait for the task to exit.
    pub async fn stop(mut self) {
        debug!("Stopping storage synchronizer");
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.shutdown.send(true);
            task.abort();
        }
    }
}
