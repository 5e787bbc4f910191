//! Worker coordinator module
//!
//! Polls the object source, fans objects out over a bounded worker pool and
//! turns every outcome into exactly one cursor state call.
//!
//! # Overview
//!
//! The coordinator module provides:
//! - `WorkerCoordinator` - Poll loop, dispatch and commit protocol
//! - `plan_cycle` - Selection of the objects one cycle dispatches
//! - `ObjectOutcome` / `CycleStats` - Per-object and per-cycle results

mod plan;
mod types;

pub use plan::{plan_cycle, CyclePlan, PlanFilter};
pub use types::{CycleStats, ObjectOutcome};

use crate::config::PollerConfig;
use crate::error::{Error, Result};
use crate::metrics::MetricsSink;
use crate::persist::CheckpointStore;
use crate::publish::Publisher;
use crate::source::{ObjectInfo, ObjectSource};
use crate::state::{CursorState, FailureOutcome};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives polling and object processing for one source
pub struct WorkerCoordinator {
    /// Shared cursor state
    state: Arc<CursorState>,
    /// Object source
    source: Arc<dyn ObjectSource>,
    /// Downstream publisher
    publisher: Arc<dyn Publisher>,
    /// Checkpoint store
    store: Arc<dyn CheckpointStore>,
    /// Checkpoint key of this source
    key: String,
    /// Object filter applied while planning
    filter: PlanFilter,
    /// Maximum concurrent workers
    max_workers: usize,
    /// Keep polling after the first cycle
    poll: bool,
    /// Pause between cycles
    poll_interval: Duration,
    /// Time allowed per download
    bucket_timeout: Duration,
    /// Objects abandoned during this process lifetime, by modification time
    abandoned: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl WorkerCoordinator {
    /// Validate the configuration and restore the checkpoint of this source
    ///
    /// Fails with a configuration error before anything is listed.
    pub async fn start(
        config: &PollerConfig,
        source: Arc<dyn ObjectSource>,
        publisher: Arc<dyn Publisher>,
        store: Arc<dyn CheckpointStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        config.validate()?;

        let key = config.source_key();
        let mut state = CursorState::new(config.max_retries, metrics)?;

        match store.get(&key).await? {
            Some(checkpoint) => {
                info!(
                    key = %key,
                    object = %checkpoint.watermark_name,
                    time = %checkpoint.watermark_time,
                    tracked = checkpoint.retry_ledger.len(),
                    "Restored checkpoint"
                );
                state.restore(checkpoint);
            }
            None => info!(key = %key, "No checkpoint found, starting from scratch"),
        }

        Ok(Self {
            state: Arc::new(state),
            source,
            publisher,
            store,
            key,
            filter: PlanFilter {
                selectors: config.selectors()?,
                epoch: config.epoch(),
            },
            max_workers: config.max_workers,
            poll: config.poll,
            poll_interval: config.poll_interval(),
            bucket_timeout: config.bucket_timeout(),
            abandoned: Mutex::new(HashMap::new()),
        })
    }

    /// Get the cursor state
    pub fn state(&self) -> &Arc<CursorState> {
        &self.state
    }

    /// Checkpoint key of this source
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Poll until cancelled, or run a single cycle when polling is off
    ///
    /// A failed listing ends that cycle only; polling continues.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        if !self.poll {
            let stats = self.run_cycle(&cancel).await?;
            info!(source = self.source.url(), ?stats, "Cycle finished");
            return Ok(());
        }

        loop {
            match self.run_cycle(&cancel).await {
                Ok(stats) => info!(source = self.source.url(), ?stats, "Cycle finished"),
                Err(e) => error!(source = self.source.url(), error = %e, "Cycle failed"),
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(source = self.source.url(), "Polling stopped");
        Ok(())
    }

    /// Run one list-plan-dispatch cycle
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleStats> {
        let start = Instant::now();
        let mut stats = CycleStats::new();

        let mut listing = self.source.list().await?;
        stats.listed = listing.len();
        self.skip_abandoned(&mut listing);

        // No worker runs between cycles, so the snapshot is current here
        let checkpoint = self.state.snapshot();
        let plan = plan_cycle(listing, &checkpoint, &self.filter);
        debug!(
            dispatch = plan.dispatch.len(),
            skipped = plan.skipped,
            vanished = plan.vanished.len(),
            "Cycle planned"
        );

        for name in &plan.vanished {
            if self.state.discard_failure(name).await {
                stats.discarded += 1;
                warn!(object = %name, "Failed object no longer listed, discarded");
            }
        }

        stats.dispatched = plan.dispatch.len();
        let outcomes: Vec<ObjectOutcome> = futures::stream::iter(plan.dispatch)
            .map(|object| self.process(object, cancel))
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        for outcome in &outcomes {
            stats.record(outcome);
        }

        stats.set_duration(start.elapsed().as_millis() as u64);
        Ok(stats)
    }

    /// Take one object through its attempt and record the outcome
    async fn process(&self, object: ObjectInfo, cancel: &CancellationToken) -> ObjectOutcome {
        if cancel.is_cancelled() {
            return ObjectOutcome::Cancelled;
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(object = %object.name, "Attempt cancelled");
                return ObjectOutcome::Cancelled;
            }
            result = self.attempt(&object) => result,
        };

        match result {
            Ok(events) => self.commit(&object, events).await,
            Err(e) => {
                if e.is_transient() {
                    warn!(object = %object.name, error = %e, "Failed to process object");
                } else {
                    error!(
                        object = %object.name,
                        error = %e,
                        "Unexpected error processing object"
                    );
                }
                match self.state.record_failure(&object.name).await {
                    FailureOutcome::Retrying(attempts) => ObjectOutcome::Retrying { attempts },
                    FailureOutcome::Abandoned { attempts } => {
                        self.abandoned
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(object.name.clone(), object.modified);
                        ObjectOutcome::Abandoned { attempts }
                    }
                }
            }
        }
    }

    /// Drop abandoned objects from a listing
    ///
    /// An abandoned object comes back only once it is rewritten with a new
    /// modification time. Entries for objects no longer listed are forgotten.
    fn skip_abandoned(&self, listing: &mut Vec<ObjectInfo>) {
        let mut abandoned = self.abandoned.lock().unwrap_or_else(PoisonError::into_inner);
        if abandoned.is_empty() {
            return;
        }

        let mut listed = HashMap::with_capacity(abandoned.len());
        listing.retain(|object| match abandoned.get(&object.name) {
            Some(modified) if *modified == object.modified => {
                listed.insert(object.name.clone(), object.modified);
                false
            }
            _ => true,
        });
        *abandoned = listed;
    }

    /// Download and publish one object
    async fn attempt(&self, object: &ObjectInfo) -> Result<usize> {
        let body = tokio::time::timeout(self.bucket_timeout, self.source.fetch(&object.name))
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: self.bucket_timeout.as_millis() as u64,
            })??;

        self.publisher.publish(object, body).await
    }

    /// Commit an object and persist the checkpoint inside the commit section
    async fn commit(&self, object: &ObjectInfo, events: usize) -> ObjectOutcome {
        let guard = self.state.commit(&object.name, object.modified).await;
        let persisted = guard.persist(self.store.as_ref(), &self.key).await;
        drop(guard);

        match persisted {
            Ok(()) => {
                debug!(object = %object.name, events, "Object committed");
                ObjectOutcome::Committed {
                    events,
                    persisted: true,
                }
            }
            Err(e) => {
                warn!(object = %object.name, key = %self.key, error = %e, "Checkpoint not persisted");
                ObjectOutcome::Committed {
                    events,
                    persisted: false,
                }
            }
        }
    }
}

impl std::fmt::Debug for WorkerCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerCoordinator")
            .field("key", &self.key)
            .field("max_workers", &self.max_workers)
            .field("poll", &self.poll)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
