//! Seed-user neighbourhood discovery.
//!
//! Starting from one user's completed and planning lists, find every other
//! user who rated the same media, capped per media id.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use anilist_client::{AnilistApi, CompleterCrawler};
use anyhow::{Context, Result};
use shared::UserSet;
use tracing::info;

/// Rolling window used for the time-remaining estimate.
const ETA_WINDOW: usize = 10;

/// Outcome counters for one discovery run.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryStats {
    pub media_crawled: usize,
    pub users_found: usize,
}

/// Crawl settings for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Upper bound on rated completers collected per media id
    pub completers_per_media: usize,
    /// Completer pages fetched per request window
    pub pages_per_request: i64,
    /// Entries requested per page
    pub per_page: i64,
}

/// Collect the ids of users who rated anything on the seed user's completed
/// or planning lists.
///
/// The per-media cap counts every yielded completer, new or already seen, so
/// a popular media contributes at most `completers_per_media` pulls before
/// the crawl moves on.
pub async fn discover_raters<A: AnilistApi>(
    api: &mut A,
    seed_user: &str,
    settings: &DiscoverySettings,
) -> Result<(UserSet, DiscoveryStats)> {
    let mut completed = api
        .fetch_completed_by_names(&[seed_user.to_string()])
        .await
        .with_context(|| format!("Failed to fetch completed list for seed user {}", seed_user))?;
    let completed = completed.remove(seed_user).unwrap_or_default();

    let planning = api
        .fetch_planning(None, Some(seed_user))
        .await
        .with_context(|| format!("Failed to fetch planning list for seed user {}", seed_user))?;

    // Search set: everything the seed has watched or intends to watch, with
    // titles kept around for progress reporting.
    let mut titles: BTreeMap<i64, String> = planning;
    for entry in &completed {
        titles.insert(entry.media_id, entry.title.clone());
    }

    info!(
        seed_user,
        completed = completed.len(),
        media = titles.len(),
        "Search set assembled"
    );

    let mut raters = UserSet::new();
    let mut stats = DiscoveryStats::default();
    let mut recent_durations: VecDeque<f64> = VecDeque::with_capacity(ETA_WINDOW);

    for (index, (media_id, title)) in titles.iter().enumerate() {
        let started = Instant::now();

        let mut crawler =
            CompleterCrawler::new(api, *media_id, settings.pages_per_request, settings.per_page);
        let mut collected = 0usize;
        while collected < settings.completers_per_media {
            match crawler.next_user().await? {
                Some(user_id) => {
                    raters.insert(user_id);
                    collected += 1;
                }
                None => break,
            }
        }

        stats.media_crawled += 1;

        if recent_durations.len() == ETA_WINDOW {
            recent_durations.pop_front();
        }
        recent_durations.push_back(started.elapsed().as_secs_f64());
        let mean = recent_durations.iter().sum::<f64>() / recent_durations.len() as f64;
        let eta_minutes = mean * (titles.len() - index - 1) as f64 / 60.0;

        info!(
            progress = format!("{}/{}", index + 1, titles.len()),
            media_id,
            title = %title,
            completers = collected,
            unique_users = raters.len(),
            eta_minutes = format!("{:.1}", eta_minutes),
            "Crawled completers for media"
        );
    }

    stats.users_found = raters.len();
    Ok((raters, stats))
}
