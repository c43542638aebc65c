//! Ratings collection CLI.

use anilist_client::AnilistClient;
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use ratings_collector::checkpoint::{self, CheckpointStore};
use ratings_collector::pipeline::BatchPipeline;
use shared::Config;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Fetch completed-list scores for a set of AniList users", long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["userid_list", "checkpoint_file"])))]
struct Args {
    /// JSON file with the flat array of user ids to crawl
    #[arg(long)]
    userid_list: Option<PathBuf>,

    /// Checkpoint file to resume from and keep updated
    #[arg(long)]
    checkpoint_file: Option<PathBuf>,

    /// Output file for the assembled ratings table
    #[arg(long, default_value = "ratings.json")]
    ratings_out: PathBuf,

    /// Users per batched request (defaults to the configured value)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config
            .logging
            .default_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "ratings-collector".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("Ratings collector starting");

    let client = AnilistClient::new(&config.anilist).context("Failed to create AniList client")?;
    let batch_size = args.batch_size.unwrap_or(config.collector.batch_size);

    let (ratings, stats) = match (&args.userid_list, &args.checkpoint_file) {
        (Some(path), None) => {
            let user_ids = checkpoint::load_user_ids(path)?;
            info!(users = user_ids.len(), batch_size, "Starting fresh crawl");

            let mut pipeline = BatchPipeline::new(
                client,
                batch_size,
                config.collector.checkpoint_interval,
                None,
            );
            pipeline.run(user_ids).await?
        }
        (None, Some(path)) => {
            let store = CheckpointStore::new(path.clone());
            let state = store.load().context("Failed to load checkpoint")?;
            info!(
                remaining = state.remaining_users.len(),
                last_batch = state.last_batch,
                batch_size,
                "Resuming crawl from checkpoint"
            );

            let mut pipeline = BatchPipeline::new(
                client,
                batch_size,
                config.collector.checkpoint_interval,
                Some(store),
            );
            pipeline.resume(state).await?
        }
        _ => unreachable!("clap enforces exactly one input source"),
    };

    checkpoint::save_results(&ratings, &args.ratings_out)?;

    info!("=== Crawl Complete ===");
    info!("Batches processed: {}", stats.batches_completed);
    info!("Batches skipped: {}", stats.batches_skipped);
    info!("Users with data: {}", stats.users_with_data);
    info!("Ratings recorded: {}", stats.ratings_recorded);
    info!(
        "Ratings saved to {}",
        args.ratings_out.display()
    );

    Ok(())
}
