//! File-backed checkpoint store
//!
//! Writes to a temp file first, then renames for atomicity.

use super::CheckpointStore;
use crate::error::{Error, Result};
use crate::state::Checkpoint;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Checkpoint store keeping one JSON file per key in a directory
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the checkpoint files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path used for `key`
    ///
    /// Every byte outside `[A-Za-z0-9.-]` is written as `%XX`, so distinct
    /// keys never share a file.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut file_name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
                file_name.push(char::from(byte));
            } else {
                file_name.push_str(&format!("%{byte:02X}"));
            }
        }
        self.dir.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn put(&self, key: &str, checkpoint: &Checkpoint) -> Result<()> {
        let contents = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| Error::persistence(key, format!("Failed to serialize state: {e}")))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::persistence(key, format!("Failed to create state directory: {e}"))
        })?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::persistence(key, format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| Error::persistence(key, format!("Failed to rename state file: {e}")))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Checkpoint>> {
        let path = self.path_for(key);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::persistence(key, format!("Failed to read state file: {e}")))?;

        let checkpoint = serde_json::from_str(&contents)
            .map_err(|e| Error::persistence(key, format!("Failed to parse state file: {e}")))?;

        Ok(Some(checkpoint))
    }
}
