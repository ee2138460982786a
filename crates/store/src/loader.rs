//! Collection loader: page walk, detail resolution, eager batch resolution.

use std::sync::Arc;
use std::time::Instant;

use dex_core::{Collection, DetailRecord, DexError, DexResult, Item, SummaryItem};
use dex_remote::RemoteSource;
use futures::StreamExt;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::resolver::{DetailResolver, DirectResolver, MemoResolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Upper bound on pages followed by one walk.
    pub max_pages: usize,
    /// Detail fetches in flight during `resolve_all`.
    pub concurrency: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { max_pages: 10_000, concurrency: 8 }
    }
}

pub struct Loader {
    source: RemoteSource,
    resolver: Arc<dyn DetailResolver>,
    cfg: LoaderConfig,
}

impl Loader {
    pub fn new(source: RemoteSource, resolver: Arc<dyn DetailResolver>, cfg: LoaderConfig) -> Self {
        Self { source, resolver, cfg }
    }

    /// Loader whose detail lookups always hit the transport.
    pub fn direct(source: RemoteSource, cfg: LoaderConfig) -> Self {
        let resolver = Arc::new(DirectResolver::new(source.clone()));
        Self::new(source, resolver, cfg)
    }

    /// Loader with a memoizing, single-flight detail resolver.
    pub fn memoized(source: RemoteSource, cfg: LoaderConfig) -> Self {
        let resolver = Arc::new(MemoResolver::new(source.clone()));
        Self::new(source, resolver, cfg)
    }

    pub fn source(&self) -> &RemoteSource { &self.source }
    pub fn config(&self) -> &LoaderConfig { &self.cfg }

    /// Walk every page from the first locator until no `next` remains.
    ///
    /// Items keep page order and in-page order. Summary ids are assigned as
    /// the 1-based position across the whole walk.
    pub async fn load_all(&self) -> DexResult<Collection> {
        let t0 = Instant::now();
        let first = self.source.first_page_url();
        info!(url = %first, "loader: load_all start");
        let mut next = Some(first);
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut items: Vec<Item> = Vec::new();
        let mut pages = 0usize;
        // The first page is always fetched.
        let max_pages = self.cfg.max_pages.max(1);
        while let Some(url) = next.take() {
            if pages >= max_pages {
                warn!(pages, url = %url, "loader: page limit reached");
                return Err(DexError::MalformedResponse(format!("page limit {} exceeded before {}", max_pages, url)));
            }
            if !seen.insert(url.clone()) {
                warn!(url = %url, "loader: next pointer revisits a page");
                return Err(DexError::MalformedResponse(format!("next pointer loops back to {}", url)));
            }
            let page = self.source.fetch_page(&url).await?;
            pages += 1;
            metrics::counter!("loader_pages_total", 1u64);
            items.reserve(page.items.len());
            for doc in page.items {
                let id = items.len() as u32 + 1;
                items.push(Item::Summary(SummaryItem { id: Some(id), name: doc.name, url: doc.url }));
            }
            debug!(page = pages, total = items.len(), "loader: page appended");
            next = page.next;
        }
        info!(pages, count = items.len(), took_ms = %t0.elapsed().as_millis(), "loader: load_all ok");
        Ok(Collection::new(items))
    }

    pub async fn resolve_detail(&self, url: &str) -> DexResult<DetailRecord> {
        self.resolver.resolve(url).await
    }

    /// Resolve every summary item, keeping already-resolved ones.
    ///
    /// Fetches run concurrently; the result keeps the input order. All or
    /// nothing: every failure is logged, and the error returned keeps the kind
    /// and message of the first failure in item order plus the failed count
    /// and locators.
    pub async fn resolve_all(&self, collection: &Collection) -> DexResult<Collection> {
        let t0 = Instant::now();
        let total = collection.count();
        info!(total, concurrency = self.cfg.concurrency, "loader: resolve_all start");
        let results: Vec<DexResult<Item>> = futures::stream::iter(collection.iter().cloned())
            .map(|item| async move {
                match item {
                    Item::Summary(s) => self.resolver.resolve(&s.url).await.map(Item::Detail),
                    resolved => Ok(resolved),
                }
            })
            .buffered(self.cfg.concurrency.max(1))
            .collect()
            .await;

        let mut first_err: Option<DexError> = None;
        let mut failed_urls: Vec<&str> = Vec::new();
        let mut out = Vec::with_capacity(results.len());
        for (i, (res, src)) in results.into_iter().zip(collection.iter()).enumerate() {
            match res {
                Ok(item) => out.push(item),
                Err(e) => {
                    warn!(index = i, url = %src.url(), error = %e, "loader: detail resolution failed");
                    failed_urls.push(src.url());
                    first_err.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_err {
            let failed = failed_urls.len();
            warn!(failed, total, took_ms = %t0.elapsed().as_millis(), "loader: resolve_all failed");
            return Err(e.map_message(|m| failure_summary(m, total, &failed_urls)));
        }
        info!(total, took_ms = %t0.elapsed().as_millis(), "loader: resolve_all ok");
        Ok(Collection::new(out))
    }
}

const LISTED_FAILURES: usize = 5;

/// `<first message> (<n> of <total> failed: url, url, ...)`
fn failure_summary(first: String, total: usize, urls: &[&str]) -> String {
    let mut listed = urls.iter().take(LISTED_FAILURES).copied().collect::<Vec<_>>().join(", ");
    if urls.len() > LISTED_FAILURES {
        listed.push_str(&format!(", +{} more", urls.len() - LISTED_FAILURES));
    }
    format!("{} ({} of {} failed: {})", first, urls.len(), total, listed)
}
