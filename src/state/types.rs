//! Checkpoint types
//!
//! These types are serialized to JSON and persisted between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Durable cursor for one object source
///
/// The store only orders listings by name, and modification times are not
/// monotonic across objects, so progress is tracked on both axes. Objects
/// that failed are tracked separately in the retry ledger so they are
/// retried regardless of where they sort relative to the watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Case-insensitively greatest committed object name
    #[serde(rename = "object_name", default)]
    pub watermark_name: String,

    /// Latest modification time among committed objects
    #[serde(rename = "latest_entry_time", default = "zero_time")]
    pub watermark_time: DateTime<Utc>,

    /// Failing object name -> attempt count
    #[serde(
        rename = "failed_jobs",
        default,
        deserialize_with = "deserialize_ledger"
    )]
    pub retry_ledger: HashMap<String, u32>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            watermark_name: String::new(),
            watermark_time: zero_time(),
            retry_ledger: HashMap::new(),
        }
    }
}

impl Checkpoint {
    /// Create an empty checkpoint
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing has been committed or tracked yet
    pub fn is_empty(&self) -> bool {
        self.watermark_name.is_empty()
            && is_zero_time(&self.watermark_time)
            && self.retry_ledger.is_empty()
    }

    /// Whether `name` is currently in the retry ledger
    pub fn is_tracked(&self, name: &str) -> bool {
        self.retry_ledger.contains_key(name)
    }

    /// Attempt count for a failing object
    pub fn attempts(&self, name: &str) -> Option<u32> {
        self.retry_ledger.get(name).copied()
    }

    /// Whether an object lies beyond the watermark on either axis
    pub fn is_past_watermark(&self, name: &str, modified: DateTime<Utc>) -> bool {
        self.watermark_name.is_empty()
            || cmp_names(name, &self.watermark_name) == Ordering::Greater
            || is_zero_time(&self.watermark_time)
            || modified > self.watermark_time
    }

    /// Whether a listed object needs no further attempt
    ///
    /// True when it is neither in the retry ledger nor past the watermark.
    pub fn is_seen(&self, name: &str, modified: DateTime<Utc>) -> bool {
        !self.is_tracked(name) && !self.is_past_watermark(name, modified)
    }

    /// Advance the watermark with a committed object. Never regresses.
    pub(crate) fn advance(&mut self, name: &str, modified: DateTime<Utc>) {
        if self.watermark_name.is_empty()
            || cmp_names(name, &self.watermark_name) == Ordering::Greater
        {
            self.watermark_name = name.to_string();
        }

        if is_zero_time(&self.watermark_time) || modified > self.watermark_time {
            self.watermark_time = modified;
        }
    }
}

/// Compare object names ignoring case
pub fn cmp_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Seconds from 0001-01-01T00:00:00Z to the Unix epoch
const ZERO_TIME_SECS: i64 = -62_135_596_800;

/// The "unset" timestamp, `0001-01-01T00:00:00Z`
///
/// Matches the zero value found in existing records. Real times before 1970
/// remain ordinary timestamps.
pub fn zero_time() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIME_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Whether `time` is the unset timestamp
pub fn is_zero_time(time: &DateTime<Utc>) -> bool {
    *time == zero_time()
}

// A `null` ledger is normalized the same way as a missing one
fn deserialize_ledger<'de, D>(deserializer: D) -> Result<HashMap<String, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<HashMap<String, u32>>::deserialize(deserializer).map(Option::unwrap_or_default)
}
