//! Cache coordinator: decides between serving the stored copy and fetching now.
//!
//! - A stored row with non-empty content is served immediately (after its
//!   `last_accessed` bump) and a background refresh is queued.
//! - A missing row, or one without content, is fetched synchronously and
//!   the written row is returned, so callers never see an empty placeholder.
//!
//! Concurrent resolves of the same URL are not deduplicated; the store's
//! upsert on `url` is the serialization point and the last writer wins.

use std::sync::Arc;

use scrapecache_client::Fetcher;
use scrapecache_core::{Error, Page, PageStore};

use crate::refresh::RefreshQueue;

pub struct Coordinator {
    store: PageStore,
    fetcher: Arc<dyn Fetcher>,
    refresh: RefreshQueue,
}

impl Coordinator {
    pub fn new(store: PageStore, fetcher: Arc<dyn Fetcher>, refresh: RefreshQueue) -> Self {
        Self { store, fetcher, refresh }
    }

    /// Return the page for `url`, fetching it first if nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Store failures on the synchronous path. Fetch failures never error;
    /// they are stored as placeholder content.
    pub async fn resolve(&self, url: &str) -> Result<Page, Error> {
        if let Some(cached) = self.store.find_by_url(url).await?
            && cached.has_content()
            && let Some(touched) = self.store.touch_access(cached.id).await?
        {
            self.refresh.schedule(url);
            tracing::debug!(url, id = touched.id, "served cached page, refresh queued");
            return Ok(touched);
        }

        let result = self.fetcher.fetch(url).await;
        let page = self.store.upsert(url, &result.title, &result.content).await?;

        tracing::info!(url, id = page.id, failed = result.failed, "scraped page");

        Ok(page)
    }
}
