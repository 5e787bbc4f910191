//! In-memory checkpoint store

use super::CheckpointStore;
use crate::error::Result;
use crate::state::Checkpoint;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Checkpoint store that lives as long as the process
///
/// Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    records: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no key has been written
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn put(&self, key: &str, checkpoint: &Checkpoint) -> Result<()> {
        self.records
            .write()
            .await
            .insert(key.to_string(), checkpoint.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Checkpoint>> {
        Ok(self.records.read().await.get(key).cloned())
    }
}
