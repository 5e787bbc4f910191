//! Checkpoint persistence module
//!
//! Durable storage for checkpoints, one record per logical source.
//!
//! # Overview
//!
//! The persist module provides:
//! - `CheckpointStore` - Key/value put-get contract
//! - `FileCheckpointStore` - One JSON file per key with atomic writes
//! - `MemoryCheckpointStore` - Process-local store for tests and dry runs

mod file;
mod memory;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;

use crate::error::Result;
use crate::state::Checkpoint;
use async_trait::async_trait;

/// Durable checkpoint storage
///
/// Single-key overwrite semantics, no cross-key transactions.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Store `checkpoint` under `key`, replacing any previous value
    async fn put(&self, key: &str, checkpoint: &Checkpoint) -> Result<()>;

    /// Load the checkpoint stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Checkpoint>>;
}

/// Persistence key for one logical source
pub fn source_key(input: &str, url: &str) -> String {
    format!("{input}::{url}")
}

#[cfg(test)]
mod tests;
