//! Retry ledger metrics
//!
//! Counter and gauge contract for the cursor state. Transport is left to
//! the embedding process; `CursorMetrics` keeps the values in atomics so
//! they can be read back or exported.

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Receiver of retry ledger updates
pub trait MetricsSink: Send + Sync {
    /// An object entered the retry ledger
    fn tracked_inc(&self);

    /// An object left the retry ledger
    fn tracked_dec(&self);

    /// The ledger was replaced wholesale (restore)
    fn tracked_set(&self, count: usize);

    /// An object failed for the first time
    fn failed_job(&self);

    /// An object was abandoned, either over budget or discarded
    fn expired_job(&self);
}

/// Atomic in-process metrics
#[derive(Debug, Default)]
pub struct CursorMetrics {
    tracked_failed_objects: AtomicI64,
    failed_jobs_total: AtomicU64,
    expired_failed_jobs_total: AtomicU64,
}

impl CursorMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of objects in the retry ledger
    pub fn tracked_failed_objects(&self) -> i64 {
        self.tracked_failed_objects.load(Ordering::Relaxed)
    }

    /// Objects that entered the ledger since start
    pub fn failed_jobs_total(&self) -> u64 {
        self.failed_jobs_total.load(Ordering::Relaxed)
    }

    /// Objects dropped from the ledger without committing
    pub fn expired_failed_jobs_total(&self) -> u64 {
        self.expired_failed_jobs_total.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tracked_failed_objects: self.tracked_failed_objects(),
            failed_jobs_total: self.failed_jobs_total(),
            expired_failed_jobs_total: self.expired_failed_jobs_total(),
        }
    }
}

impl MetricsSink for CursorMetrics {
    fn tracked_inc(&self) {
        self.tracked_failed_objects.fetch_add(1, Ordering::Relaxed);
    }

    fn tracked_dec(&self) {
        self.tracked_failed_objects.fetch_sub(1, Ordering::Relaxed);
    }

    fn tracked_set(&self, count: usize) {
        self.tracked_failed_objects
            .store(count as i64, Ordering::Relaxed);
    }

    fn failed_job(&self) {
        self.failed_jobs_total.fetch_add(1, Ordering::Relaxed);
    }

    fn expired_job(&self) {
        self.expired_failed_jobs_total.fetch_add(1, Ordering::Relaxed);
    }
}

/// Metrics sink that drops every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn tracked_inc(&self) {}
    fn tracked_dec(&self) {}
    fn tracked_set(&self, _count: usize) {}
    fn failed_job(&self) {}
    fn expired_job(&self) {}
}

/// Serializable copy of [`CursorMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tracked_failed_objects: i64,
    pub failed_jobs_total: u64,
    pub expired_failed_jobs_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_moves_both_ways() {
        let metrics = CursorMetrics::new();
        metrics.tracked_inc();
        metrics.tracked_inc();
        metrics.tracked_dec();
        assert_eq!(metrics.tracked_failed_objects(), 1);

        metrics.tracked_set(7);
        assert_eq!(metrics.tracked_failed_objects(), 7);
    }

    #[test]
    fn test_snapshot() {
        let metrics = CursorMetrics::new();
        metrics.failed_job();
        metrics.expired_job();
        metrics.expired_job();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                tracked_failed_objects: 0,
                failed_jobs_total: 1,
                expired_failed_jobs_total: 2,
            }
        );
    }
}
