//! Cycle planning
//!
//! Decides which listed objects a cycle dispatches, given the checkpoint.

use crate::source::ObjectInfo;
use crate::state::Checkpoint;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashSet;

/// Work selected for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CyclePlan {
    /// Objects to dispatch, each name at most once
    pub dispatch: Vec<ObjectInfo>,
    /// Retry ledger members the listing no longer contains
    pub vanished: Vec<String>,
    /// Listed objects left alone (filtered, duplicate or already seen)
    pub skipped: usize,
}

/// Filters applied before the checkpoint is consulted
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    /// Name must match at least one selector; empty accepts all
    pub selectors: Vec<Regex>,
    /// Objects modified before this are ignored
    pub epoch: Option<DateTime<Utc>>,
}

impl PlanFilter {
    /// Whether an object passes the filter
    pub fn accepts(&self, object: &ObjectInfo) -> bool {
        let selected = self.selectors.is_empty()
            || self.selectors.iter().any(|re| re.is_match(&object.name));
        let recent = self.epoch.map_or(true, |epoch| object.modified >= epoch);
        selected && recent
    }
}

/// Select the objects of one cycle
///
/// Retry ledger members are dispatched wherever they sort relative to the
/// watermark. Everything else is dispatched only when it lies past the
/// watermark on name or time.
pub fn plan_cycle(
    listing: Vec<ObjectInfo>,
    checkpoint: &Checkpoint,
    filter: &PlanFilter,
) -> CyclePlan {
    let mut plan = CyclePlan::default();
    let mut seen = HashSet::new();

    for object in listing {
        if !filter.accepts(&object) || seen.contains(&object.name) {
            plan.skipped += 1;
            continue;
        }
        seen.insert(object.name.clone());

        if checkpoint.is_seen(&object.name, object.modified) {
            plan.skipped += 1;
        } else {
            plan.dispatch.push(object);
        }
    }

    plan.vanished = checkpoint
        .retry_ledger
        .keys()
        .filter(|name| !seen.contains(*name))
        .cloned()
        .collect();
    plan.vanished.sort();

    plan
}
