//! Shared library for the AniList ratings crawler.
//!
//! This crate provides common functionality used by the binary crates:
//! - Configuration management
//! - Core data model (list entries, ratings table, checkpoints)
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;
pub use models::{AnimeEntry, CheckpointState, PlanningMap, RatingsTable, UserSet};

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
