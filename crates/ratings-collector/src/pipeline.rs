//! Batched ratings collection with periodic checkpointing.

use anilist_client::AnilistApi;
use anyhow::{Context, Result};
use shared::{CheckpointState, RatingsTable};
use tracing::{info, warn};

use crate::checkpoint::CheckpointStore;

/// Outcome counters for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub batches_total: usize,
    pub batches_completed: usize,
    pub batches_skipped: usize,
    pub users_with_data: usize,
    pub ratings_recorded: usize,
}

/// Drives the multi-user completed-list fetch over a full user-id list.
///
/// Users are processed in consecutive batches, strictly in input order. A
/// private or unknown user poisons its whole batch (the upstream error does
/// not say which member tripped it), so the batch is logged and skipped. An
/// exhausted-retry request failure aborts the run, leaving the last
/// checkpoint on disk.
pub struct BatchPipeline<A> {
    api: A,
    /// Users per batched request
    batch_size: usize,
    /// Batches between checkpoint writes
    checkpoint_interval: usize,
    store: Option<CheckpointStore>,
}

impl<A: AnilistApi> BatchPipeline<A> {
    pub fn new(
        api: A,
        batch_size: usize,
        checkpoint_interval: usize,
        store: Option<CheckpointStore>,
    ) -> Self {
        Self {
            api,
            batch_size: batch_size.max(1),
            checkpoint_interval: checkpoint_interval.max(1),
            store,
        }
    }

    /// Crawl ratings for `user_ids`, starting from an empty table.
    pub async fn run(&mut self, user_ids: Vec<i64>) -> Result<(RatingsTable, PipelineStats)> {
        self.run_from(RatingsTable::new(), user_ids, 0).await
    }

    /// Continue a crawl from a previously saved checkpoint.
    pub async fn resume(&mut self, state: CheckpointState) -> Result<(RatingsTable, PipelineStats)> {
        let CheckpointState {
            ratings,
            remaining_users,
            last_batch,
        } = state;
        self.run_from(ratings, remaining_users, last_batch + 1).await
    }

    async fn run_from(
        &mut self,
        mut ratings: RatingsTable,
        user_ids: Vec<i64>,
        first_batch: u64,
    ) -> Result<(RatingsTable, PipelineStats)> {
        let total_batches = user_ids.len().div_ceil(self.batch_size);
        let mut stats = PipelineStats {
            batches_total: total_batches,
            ..Default::default()
        };

        for (index, batch) in user_ids.chunks(self.batch_size).enumerate() {
            let batch_number = first_batch + index as u64;
            info!(
                batch = batch_number,
                progress = format!("{}/{}", index + 1, total_batches),
                users = batch.len(),
                "Processing batch"
            );

            match self.api.fetch_completed_by_ids(batch).await {
                Ok(per_user) => {
                    stats.batches_completed += 1;
                    stats.users_with_data += per_user.len();
                    for (user_id, entries) in per_user {
                        for entry in entries {
                            ratings.record(entry.media_id, user_id, entry.score);
                            stats.ratings_recorded += 1;
                        }
                    }
                }
                Err(err) if err.is_skippable() => {
                    warn!(batch = batch_number, error = %err, "Skipping batch");
                    stats.batches_skipped += 1;
                }
                Err(err) => {
                    return Err(err)
                        .context("Ratings crawl aborted by an unrecoverable request failure");
                }
            }

            let done = index + 1 == total_batches;
            if (index + 1) % self.checkpoint_interval == 0 || done {
                if let Some(store) = &self.store {
                    let processed = ((index + 1) * self.batch_size).min(user_ids.len());
                    let state = CheckpointState {
                        ratings: ratings.clone(),
                        remaining_users: user_ids[processed..].to_vec(),
                        last_batch: batch_number,
                    };
                    store.save(&state)?;
                }
            }
        }

        Ok((ratings, stats))
    }
}
