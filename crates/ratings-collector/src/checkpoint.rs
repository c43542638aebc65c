//! Checkpoint and result persistence.

use anyhow::{Context, Result};
use shared::{CheckpointState, RatingsTable};
use std::path::{Path, PathBuf};
use tracing::info;

/// Reads and writes the checkpoint file a crawl can resume from.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a previously saved checkpoint
    pub fn load(&self) -> Result<CheckpointState> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read checkpoint file: {}", self.path.display()))?;

        let state: CheckpointState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse checkpoint file: {}", self.path.display()))?;

        info!(
            path = %self.path.display(),
            media = state.ratings.media_count(),
            remaining_users = state.remaining_users.len(),
            last_batch = state.last_batch,
            "Checkpoint loaded"
        );

        Ok(state)
    }

    /// Persist the current crawl state
    pub fn save(&self, state: &CheckpointState) -> Result<()> {
        let content = serde_json::to_string(state).context("Failed to serialize checkpoint")?;

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write checkpoint file: {}", self.path.display()))?;

        info!(
            path = %self.path.display(),
            last_batch = state.last_batch,
            "Checkpoint saved"
        );

        Ok(())
    }
}

/// Write the final ratings table, pretty-printed for downstream tooling.
pub fn save_results(ratings: &RatingsTable, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(ratings).context("Failed to serialize ratings")?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write results file: {}", path.display()))?;

    info!(
        path = %path.display(),
        media = ratings.media_count(),
        ratings = ratings.rating_count(),
        "Results saved"
    );

    Ok(())
}

/// Load the flat user-id array produced by the discovery tool.
pub fn load_user_ids(path: &Path) -> Result<Vec<i64>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read user id list: {}", path.display()))?;

    let ids: Vec<i64> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse user id list: {}", path.display()))?;

    Ok(ids)
}
