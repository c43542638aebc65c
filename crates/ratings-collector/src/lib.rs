//! Batched ratings collection: pipeline, checkpointing and persistence.

pub mod checkpoint;
pub mod pipeline;

pub use checkpoint::CheckpointStore;
pub use pipeline::{BatchPipeline, PipelineStats};
