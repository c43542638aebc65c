//! Seed-user discovery CLI.

use anilist_client::AnilistClient;
use anyhow::{Context, Result};
use clap::Parser;
use shared::Config;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use user_discovery::discovery::{discover_raters, DiscoverySettings};

#[derive(Parser, Debug)]
#[command(version, about = "Discover AniList users who rated the same media as a seed user", long_about = None)]
struct Args {
    /// Seed username to expand from
    username: String,

    /// Cap on rated completers collected per media id
    #[arg(long)]
    n_others: Option<usize>,

    /// Output file for the discovered user ids
    #[arg(long, default_value = "other_users.json")]
    other_users_out: PathBuf,

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
        component: "user-discovery".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!(seed_user = %args.username, "User discovery starting");

    let mut client =
        AnilistClient::new(&config.anilist).context("Failed to create AniList client")?;

    let settings = DiscoverySettings {
        completers_per_media: args.n_others.unwrap_or(config.discovery.completers_per_media),
        pages_per_request: config.anilist.pages_per_request,
        per_page: config.anilist.per_page,
    };

    let started = Instant::now();
    let (raters, stats) = discover_raters(&mut client, &args.username, &settings).await?;

    let ids: Vec<i64> = raters.into_iter().collect();
    let content = serde_json::to_string(&ids).context("Failed to serialize user ids")?;
    std::fs::write(&args.other_users_out, content).with_context(|| {
        format!(
            "Failed to write user ids to {}",
            args.other_users_out.display()
        )
    })?;

    info!("=== Discovery Complete ===");
    info!("Media crawled: {}", stats.media_crawled);
    info!("Unique users found: {}", stats.users_found);
    info!(
        "Total time: {:.1} minutes",
        started.elapsed().as_secs_f64() / 60.0
    );
    info!("User ids saved to {}", args.other_users_out.display());

    Ok(())
}
