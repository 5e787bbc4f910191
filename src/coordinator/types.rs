//! Coordinator types
//!
//! Per-object outcomes and cycle statistics.

use serde::Serialize;

/// Terminal state of one dispatched object within a cycle
///
/// `Pending -> InFlight -> {Committed | Retrying(n) | Abandoned}`, plus
/// `Cancelled` for attempts interrupted by shutdown, which leave the cursor
/// state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectOutcome {
    /// Published and committed. `persisted` is false when the checkpoint
    /// write failed; the in-memory cursor still advanced.
    Committed { events: usize, persisted: bool },
    /// Failed, still within the retry budget
    Retrying { attempts: u32 },
    /// Failed and exceeded the retry budget
    Abandoned { attempts: u32 },
    /// Interrupted before an outcome was recorded
    Cancelled,
}

/// Statistics from one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Objects returned by the listing
    pub listed: usize,
    /// Objects dispatched to workers
    pub dispatched: usize,
    /// Objects committed
    pub committed: usize,
    /// Objects that failed and will be retried
    pub retrying: usize,
    /// Objects abandoned after exhausting their budget
    pub abandoned: usize,
    /// Ledger entries discarded because the object vanished
    pub discarded: usize,
    /// Attempts interrupted by cancellation
    pub cancelled: usize,
    /// Commits whose checkpoint write failed
    pub persist_errors: usize,
    /// Events published
    pub events: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl CycleStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one object outcome
    pub fn record(&mut self, outcome: &ObjectOutcome) {
        match outcome {
            ObjectOutcome::Committed { events, persisted } => {
                self.committed += 1;
                self.events += events;
                if !persisted {
                    self.persist_errors += 1;
                }
            }
            ObjectOutcome::Retrying { .. } => self.retrying += 1,
            ObjectOutcome::Abandoned { .. } => self.abandoned += 1,
            ObjectOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let mut stats = CycleStats::new();
        stats.record(&ObjectOutcome::Committed {
            events: 3,
            persisted: true,
        });
        stats.record(&ObjectOutcome::Committed {
            events: 2,
            persisted: false,
        });
        stats.record(&ObjectOutcome::Retrying { attempts: 1 });
        stats.record(&ObjectOutcome::Abandoned { attempts: 4 });
        stats.record(&ObjectOutcome::Cancelled);

        assert_eq!(stats.committed, 2);
        assert_eq!(stats.events, 5);
        assert_eq!(stats.persist_errors, 1);
        assert_eq!(stats.retrying, 1);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.cancelled, 1);
    }
}
