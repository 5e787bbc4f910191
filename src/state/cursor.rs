//! Cursor state
//!
//! Serializes every checkpoint mutation behind one async lock. `commit`
//! hands back a guard that keeps the lock held while the caller persists,
//! so persisted snapshots are write-ordered the same way as in-memory
//! mutations.

use super::types::Checkpoint;
use crate::error::{Error, Result};
use crate::metrics::MetricsSink;
use crate::persist::CheckpointStore;
use chrono::{DateTime, Utc};
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Default number of attempts allowed for a failing object
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Result of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still in the ledger with this many attempts
    Retrying(u32),
    /// Exceeded the retry budget and was dropped from the ledger
    Abandoned { attempts: u32 },
}

/// Shared cursor state for one source
pub struct CursorState {
    checkpoint: Mutex<Checkpoint>,
    /// Last published copy, readable without the mutation lock
    published: watch::Sender<Checkpoint>,
    max_retries: u32,
    metrics: Arc<dyn MetricsSink>,
}

impl CursorState {
    /// Create empty state with the given retry budget
    pub fn new(max_retries: u32, metrics: Arc<dyn MetricsSink>) -> Result<Self> {
        if max_retries == 0 {
            return Err(Error::invalid_value(
                "max_retries",
                "retry budget must be greater than zero",
            ));
        }

        let (published, _) = watch::channel(Checkpoint::new());
        Ok(Self {
            checkpoint: Mutex::new(Checkpoint::new()),
            published,
            max_retries,
            metrics,
        })
    }

    /// Configured retry budget
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Commit a successfully processed object
    ///
    /// A previously failing object is only removed from the retry ledger; it
    /// may be older than the current watermark, so it never moves it. The
    /// returned guard holds the lock until dropped.
    pub async fn commit(&self, name: &str, modified: DateTime<Utc>) -> CommitGuard<'_> {
        let mut checkpoint = self.checkpoint.lock().await;

        if checkpoint.retry_ledger.remove(name).is_some() {
            self.metrics.tracked_dec();
            debug!(object = name, "Retried object committed, cleared from ledger");
        } else {
            checkpoint.advance(name, modified);
        }

        self.published.send_replace(checkpoint.clone());
        CommitGuard { checkpoint }
    }

    /// Record a failed attempt for an object
    pub async fn record_failure(&self, name: &str) -> FailureOutcome {
        let mut checkpoint = self.checkpoint.lock().await;

        let attempts = checkpoint
            .retry_ledger
            .entry(name.to_string())
            .or_insert_with(|| {
                self.metrics.tracked_inc();
                self.metrics.failed_job();
                0
            });
        *attempts += 1;
        let attempts = *attempts;

        let outcome = if attempts > self.max_retries {
            checkpoint.retry_ledger.remove(name);
            self.metrics.tracked_dec();
            self.metrics.expired_job();
            warn!(
                object = name,
                attempts, "Retry budget exhausted, abandoning object"
            );
            FailureOutcome::Abandoned { attempts }
        } else {
            FailureOutcome::Retrying(attempts)
        };

        self.published.send_replace(checkpoint.clone());
        outcome
    }

    /// Drop an object from the retry ledger
    ///
    /// Used when the source no longer lists the object. Returns whether an
    /// entry was removed; gauges only move when one was.
    pub async fn discard_failure(&self, name: &str) -> bool {
        let mut checkpoint = self.checkpoint.lock().await;

        let removed = checkpoint.retry_ledger.remove(name).is_some();
        if removed {
            self.metrics.tracked_dec();
            self.metrics.expired_job();
            self.published.send_replace(checkpoint.clone());
        }
        removed
    }

    /// Replace all tracked state, e.g. with a checkpoint loaded at startup
    ///
    /// Takes `&mut self` so it cannot race with the mutators. A missing
    /// ledger has already been normalized to an empty map by deserialization.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.metrics.tracked_set(checkpoint.retry_ledger.len());
        self.published.send_replace(checkpoint.clone());
        *self.checkpoint.get_mut() = checkpoint;
    }

    /// Copy of the last published checkpoint
    ///
    /// Does not take the mutation lock and may lag behind an in-flight
    /// commit. Use it for reporting, or when no mutation can be running.
    pub fn snapshot(&self) -> Checkpoint {
        self.published.borrow().clone()
    }

    /// Watch for published checkpoints
    pub fn subscribe(&self) -> watch::Receiver<Checkpoint> {
        self.published.subscribe()
    }

    /// Whether a listed object needs no further attempt, per the last
    /// published checkpoint
    pub fn is_seen(&self, name: &str, modified: DateTime<Utc>) -> bool {
        self.published.borrow().is_seen(name, modified)
    }

    /// Whether `name` is in the last published retry ledger
    pub fn is_tracked(&self, name: &str) -> bool {
        self.published.borrow().is_tracked(name)
    }

    /// Number of objects in the last published retry ledger
    pub fn tracked_len(&self) -> usize {
        self.published.borrow().retry_ledger.len()
    }
}

impl std::fmt::Debug for CursorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorState")
            .field("max_retries", &self.max_retries)
            .field("checkpoint", &*self.published.borrow())
            .finish_non_exhaustive()
    }
}

/// Exclusive section opened by [`CursorState::commit`]
///
/// Derefs to the committed checkpoint. The lock is released when the guard
/// is dropped, on every path, so a failed persist cannot wedge the workers.
#[must_use = "dropping the guard immediately skips persistence"]
pub struct CommitGuard<'a> {
    checkpoint: MutexGuard<'a, Checkpoint>,
}

impl CommitGuard<'_> {
    /// Borrow the checkpoint as committed
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Write the checkpoint to `store` while the section is still held
    pub async fn persist(&self, store: &dyn CheckpointStore, key: &str) -> Result<()> {
        store.put(key, &self.checkpoint).await?;
        debug!(key, object = %self.checkpoint.watermark_name, "Checkpoint persisted");
        Ok(())
    }

    /// Release the section
    pub fn release(self) {}
}

impl Deref for CommitGuard<'_> {
    type Target = Checkpoint;

    fn deref(&self) -> &Self::Target {
        &self.checkpoint
    }
}
