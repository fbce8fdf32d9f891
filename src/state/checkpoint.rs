//! Checkpoint store implementation
//!
//! Provides file-based cursor persistence with atomic writes.

use super::types::ChangeFeedCrossFeedRangeState;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Checkpoint store for persisting and loading a cross-range cursor
#[derive(Debug)]
pub struct CheckpointStore {
    /// Path to the checkpoint file
    path: PathBuf,
    /// Last recorded cursor (cached)
    checkpoint: Arc<RwLock<Option<ChangeFeedCrossFeedRangeState>>>,
    /// Whether to save on every update
    auto_save: bool,
}

impl CheckpointStore {
    /// Create a new checkpoint store with the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            checkpoint: Arc::new(RwLock::new(None)),
            auto_save: true,
        }
    }

    /// Create a checkpoint store with auto-save disabled
    pub fn without_auto_save(path: impl AsRef<Path>) -> Self {
        Self {
            auto_save: false,
            ..Self::new(path)
        }
    }

    /// Create an in-memory checkpoint store (no file persistence)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            checkpoint: Arc::new(RwLock::new(None)),
            auto_save: false,
        }
    }

    /// Create a checkpoint store from a file, loading an existing cursor if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let checkpoint = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::checkpoint(format!("Failed to read checkpoint file: {e}")))?;
            Some(parse_checkpoint(&contents)?)
        } else {
            None
        };

        Ok(Self {
            path,
            checkpoint: Arc::new(RwLock::new(checkpoint)),
            auto_save: true,
        })
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this store only keeps the cursor in memory
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    /// Load the cursor from file
    pub async fn load(&self) -> Result<()> {
        if self.is_in_memory() || !self.path.exists() {
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::checkpoint(format!("Failed to read checkpoint file: {e}")))?;
        let loaded = parse_checkpoint(&contents)?;

        *self.checkpoint.write().await = Some(loaded);
        Ok(())
    }

    /// Save the current cursor to file
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let checkpoint = self.checkpoint.read().await;
        let Some(cursor) = checkpoint.as_ref() else {
            return Ok(());
        };
        let contents = serde_json::to_string_pretty(cursor)
            .map_err(|e| Error::checkpoint(format!("Failed to serialize checkpoint: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::checkpoint(format!("Failed to write checkpoint file: {e}")))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::checkpoint(format!("Failed to rename checkpoint file: {e}")))?;

        debug!(path = %self.path.display(), ranges = cursor.len(), "Saved checkpoint");
        Ok(())
    }

    /// Last recorded cursor
    pub async fn checkpoint(&self) -> Option<ChangeFeedCrossFeedRangeState> {
        self.checkpoint.read().await.clone()
    }

    /// Record a new cursor
    pub async fn update(&self, cursor: ChangeFeedCrossFeedRangeState) -> Result<()> {
        *self.checkpoint.write().await = Some(cursor);

        if self.auto_save {
            self.save().await?;
        }
        Ok(())
    }

    /// Forget the cursor and remove the checkpoint file
    pub async fn clear(&self) -> Result<()> {
        *self.checkpoint.write().await = None;

        if !self.is_in_memory() && self.path.exists() {
            tokio::fs::remove_file(&self.path)
                .await
                .map_err(|e| Error::checkpoint(format!("Failed to remove checkpoint file: {e}")))?;
        }
        Ok(())
    }
}

fn parse_checkpoint(contents: &str) -> Result<ChangeFeedCrossFeedRangeState> {
    serde_json::from_str(contents)
        .map_err(|e| Error::checkpoint(format!("Failed to parse checkpoint file: {e}")))
}
