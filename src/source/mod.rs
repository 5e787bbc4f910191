//! Object source module
//!
//! Lists and downloads objects from the polled store.
//!
//! # Overview
//!
//! The source module provides:
//! - `ObjectSource` - Listing and download contract used by the coordinator
//! - `ObjectInfo` - Descriptor of one listed object
//! - `StoreSource` - `object_store` backed source (S3, R2, GCS, Azure, local)
//! - `RateLimiter` - Token bucket throttling downloads

mod rate_limit;
mod store;

pub use rate_limit::RateLimiter;
pub use store::StoreSource;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Descriptor of one listed object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Object key
    pub name: String,
    /// Last modification time reported by the store
    pub modified: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

impl ObjectInfo {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, modified: DateTime<Utc>, size: u64) -> Self {
        Self {
            name: name.into(),
            modified,
            size,
        }
    }
}

/// Polled object store
///
/// Listings come in no guaranteed order and may be eventually consistent.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// List every object currently visible
    async fn list(&self) -> Result<Vec<ObjectInfo>>;

    /// Download one object
    async fn fetch(&self, name: &str) -> Result<Bytes>;

    /// Source URL, for logging
    fn url(&self) -> &str;
}
