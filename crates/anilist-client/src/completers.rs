//! Windowed pagination over the completers of a single media id.

use std::collections::VecDeque;

use tracing::debug;

use crate::client::AnilistApi;
use crate::error::ApiError;
use crate::query;
use crate::response;

/// Pull-based crawl over every user who completed a given media.
///
/// Pages are fetched in windows of `pages_per_request` aliased sub-queries
/// per round trip and drained in page order. Entries with a zero score were
/// logged but never rated and are filtered out. The crawl is finite and
/// cannot be restarted; a consumer that hits its cap simply stops pulling.
pub struct CompleterCrawler<'a, A: AnilistApi> {
    api: &'a mut A,
    media_id: i64,
    /// First page of the next window
    next_page: i64,
    pages_per_request: i64,
    per_page: i64,
    buffered: VecDeque<i64>,
    exhausted: bool,
}

impl<'a, A: AnilistApi> CompleterCrawler<'a, A> {
    pub fn new(api: &'a mut A, media_id: i64, pages_per_request: i64, per_page: i64) -> Self {
        Self {
            api,
            media_id,
            next_page: 1,
            pages_per_request: pages_per_request.max(1),
            per_page,
            buffered: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Next user id with a positive score, or `None` once every page has been
    /// drained.
    pub async fn next_user(&mut self) -> Result<Option<i64>, ApiError> {
        while self.buffered.is_empty() && !self.exhausted {
            self.fetch_window().await?;
        }
        Ok(self.buffered.pop_front())
    }

    async fn fetch_window(&mut self) -> Result<(), ApiError> {
        let first_page = self.next_page;
        let doc = query::completer_pages(
            self.media_id,
            first_page,
            self.pages_per_request,
            self.per_page,
        );
        let body = self.api.execute(&doc).await?;
        let data = response::data_object(body)?;

        // The crawl advances past this window only if the last page actually
        // returned says more data exists.
        let mut last_has_next = false;
        for page in first_page..first_page + self.pages_per_request {
            let Some(page_data) = response::completer_page(&data, page)? else {
                // A null page means the window ran past the end of the data
                last_has_next = false;
                break;
            };

            for entry in &page_data.media_list {
                if entry.score > 0 {
                    self.buffered.push_back(entry.user_id);
                }
            }

            last_has_next = page_data.page_info.has_next_page;
            if !last_has_next {
                break;
            }
        }

        if last_has_next {
            self.next_page = first_page + self.pages_per_request;
        } else {
            self.exhausted = true;
        }

        debug!(
            media_id = self.media_id,
            first_page,
            buffered = self.buffered.len(),
            exhausted = self.exhausted,
            "Fetched completer window"
        );
        Ok(())
    }
}
