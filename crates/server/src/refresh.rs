//! Background refresh queue.
//!
//! Refreshes are fire-and-forget: [`RefreshQueue::schedule`] only enqueues
//! the URL. A fixed set of workers drains the queue, each one fetching the
//! page and upserting the result through the store handle the queue was
//! started with, never the handle of the request that asked for it.
//!
//! Failures are logged and dropped; nobody is waiting on a refresh.

use std::sync::Arc;

use scrapecache_client::Fetcher;
use scrapecache_core::{AppConfig, PageStore};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Tuning for the refresh workers.
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub workers: usize,
    pub capacity: usize,
    /// Write the error placeholder over stored content when a refresh fetch fails.
    pub overwrite_on_failure: bool,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self { workers: 4, capacity: 256, overwrite_on_failure: true }
    }
}

impl From<&AppConfig> for RefreshOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            workers: config.refresh_workers,
            capacity: config.refresh_queue_capacity,
            overwrite_on_failure: config.overwrite_on_refresh_failure,
        }
    }
}

/// Sending half of the refresh queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct RefreshQueue {
    tx: mpsc::Sender<String>,
}

/// Handles for the worker tasks.
///
/// Workers exit once every [`RefreshQueue`] clone is dropped and the
/// pending URLs are drained.
pub struct RefreshWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl RefreshQueue {
    /// Spawn the workers and return the queue feeding them.
    pub fn start(store: PageStore, fetcher: Arc<dyn Fetcher>, options: RefreshOptions) -> (Self, RefreshWorkers) {
        let (tx, rx) = mpsc::channel::<String>(options.capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..options.workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let store = store.clone();
                let fetcher = Arc::clone(&fetcher);
                let overwrite = options.overwrite_on_failure;
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(url) = next else { break };
                        refresh_page(&store, fetcher.as_ref(), &url, overwrite).await;
                    }
                    tracing::debug!(worker, "refresh worker stopped");
                })
            })
            .collect();

        (Self { tx }, RefreshWorkers { handles })
    }

    /// Enqueue a refresh without waiting for it.
    ///
    /// Returns false if the queue is full or closed, in which case the
    /// refresh is dropped.
    pub fn schedule(&self, url: &str) -> bool {
        match self.tx.try_send(url.to_string()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(url)) => {
                tracing::warn!(url, "refresh queue full, skipping background refresh");
                false
            }
            Err(mpsc::error::TrySendError::Closed(url)) => {
                tracing::warn!(url, "refresh queue closed, skipping background refresh");
                false
            }
        }
    }
}

impl RefreshWorkers {
    /// Wait for every worker to finish draining the queue.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "refresh worker panicked");
            }
        }
    }
}

async fn refresh_page(store: &PageStore, fetcher: &dyn Fetcher, url: &str, overwrite_on_failure: bool) {
    let result = fetcher.fetch(url).await;

    if result.failed && !overwrite_on_failure {
        match store.find_by_url(url).await {
            Ok(Some(existing)) if existing.has_content() => {
                tracing::warn!(url, id = existing.id, "background refresh failed, keeping stored content");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(url, error = %e, "background refresh lookup failed");
                return;
            }
        }
    }

    match store.upsert(url, &result.title, &result.content).await {
        Ok(page) => tracing::info!(url, id = page.id, failed = result.failed, "background refresh saved"),
        Err(e) => tracing::error!(url, error = %e, "background refresh failed to save"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted fetcher shared by the server's tests.

    use async_trait::async_trait;
    use scrapecache_client::{FetchError, FetchResult, Fetcher};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Fetcher that answers from a script and counts calls.
    #[derive(Default)]
    pub struct ScriptedFetcher {
        calls: AtomicUsize,
        failing: AtomicBool,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedFetcher {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Every fetch waits on `gate` before answering.
        pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self { gate: Some(gate), ..Default::default() })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> FetchResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return FetchResult::failure(&FetchError::Body(format!("scripted failure for {url}")));
            }
            FetchResult { title: format!("Title {n}"), content: format!("content {n} of {url}"), failed: false }
        }
    }
}
