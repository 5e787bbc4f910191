//! Configuration for a polling input
//!
//! Loaded from YAML and validated before anything starts. Validation
//! failures are fatal.

use crate::error::{Error, Result};
use crate::persist::source_key;
use crate::source::RateLimiter;
use crate::state::DEFAULT_MAX_RETRIES;
use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete poller configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Logical input name, part of the checkpoint key
    pub id: String,

    /// Object source URL (s3://, r2://, gs://, az://, file:// or a local path)
    pub url: String,

    /// Directory for checkpoint files. Without it checkpoints are kept in memory.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Number of concurrent download workers
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Attempts allowed for a failing object before it is abandoned
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Keep polling; when false a single cycle runs
    #[serde(default = "default_poll")]
    pub poll: bool,

    /// Seconds between poll cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds allowed for one object download
    #[serde(default = "default_bucket_timeout_secs")]
    pub bucket_timeout_secs: u64,

    /// Regexes an object name must match (any of). Empty accepts everything.
    #[serde(default)]
    pub file_selectors: Vec<String>,

    /// Ignore objects modified before this Unix timestamp (seconds)
    #[serde(default)]
    pub timestamp_epoch: Option<i64>,

    /// Download rate limit
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

fn default_max_workers() -> usize {
    5
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_poll() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_bucket_timeout_secs() -> u64 {
    120
}

/// Token bucket settings for object downloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained downloads per second
    pub requests_per_second: u32,

    /// Burst size
    #[serde(default)]
    pub burst_size: Option<u32>,
}

impl RateLimitConfig {
    /// Build the download limiter; the burst defaults to the sustained rate
    pub fn limiter(&self) -> Result<RateLimiter> {
        RateLimiter::new(self.requests_per_second, self.burst_size.unwrap_or(0))
    }
}

impl PollerConfig {
    /// Minimal config for a source, everything else defaulted
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            state_dir: None,
            max_workers: default_max_workers(),
            max_retries: default_max_retries(),
            poll: default_poll(),
            poll_interval_secs: default_poll_interval_secs(),
            bucket_timeout_secs: default_bucket_timeout_secs(),
            file_selectors: Vec::new(),
            timestamp_epoch: None,
            rate_limit: None,
        }
    }

    /// Validate every field
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::invalid_value("id", "input id cannot be empty"));
        }

        if self.url.trim().is_empty() {
            return Err(Error::invalid_value("url", "source url cannot be empty"));
        }

        if self.max_workers == 0 {
            return Err(Error::invalid_value(
                "max_workers",
                "at least one worker is required",
            ));
        }

        if self.max_retries == 0 {
            return Err(Error::invalid_value(
                "max_retries",
                "retry budget must be greater than zero",
            ));
        }

        if self.poll && self.poll_interval_secs == 0 {
            return Err(Error::invalid_value(
                "poll_interval_secs",
                "poll interval must be greater than zero",
            ));
        }

        if self.bucket_timeout_secs == 0 {
            return Err(Error::invalid_value(
                "bucket_timeout_secs",
                "download timeout must be greater than zero",
            ));
        }

        if let Some(rate_limit) = &self.rate_limit {
            if rate_limit.requests_per_second == 0 {
                return Err(Error::invalid_value(
                    "rate_limit.requests_per_second",
                    "must be greater than zero",
                ));
            }
        }

        if self.timestamp_epoch.is_some() && self.epoch().is_none() {
            return Err(Error::invalid_value(
                "timestamp_epoch",
                "not a valid Unix timestamp",
            ));
        }

        self.selectors()?;
        Ok(())
    }

    /// Compiled file selectors
    pub fn selectors(&self) -> Result<Vec<Regex>> {
        self.file_selectors
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::invalid_value("file_selectors", format!("'{pattern}': {e}"))
                })
            })
            .collect()
    }

    /// Objects modified before this are skipped
    pub fn epoch(&self) -> Option<DateTime<Utc>> {
        self.timestamp_epoch
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// Time between poll cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Time allowed for one download
    pub fn bucket_timeout(&self) -> Duration {
        Duration::from_secs(self.bucket_timeout_secs)
    }

    /// Checkpoint key for this source
    pub fn source_key(&self) -> String {
        source_key(&self.id, &self.url)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a config file
pub fn load_config(path: impl AsRef<Path>) -> Result<PollerConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_config_from_str(&content)
}

/// Load and validate a config from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<PollerConfig> {
    let config: PollerConfig = serde_yaml::from_str(yaml)?;

    config.validate()?;
    Ok(config)
}
