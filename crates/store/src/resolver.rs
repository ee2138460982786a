//! Detail resolution strategies.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dex_core::{DetailRecord, DexResult};
use dex_remote::RemoteSource;
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;
use tracing::debug;

/// Turns a detail locator into a record. Callers go through this seam so
/// the caching/flight policy can change without touching them.
#[async_trait]
pub trait DetailResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> DexResult<DetailRecord>;
}

/// Every call reaches the transport; concurrent duplicates are possible.
pub struct DirectResolver {
    source: RemoteSource,
}

impl DirectResolver {
    pub fn new(source: RemoteSource) -> Self { Self { source } }
}

#[async_trait]
impl DetailResolver for DirectResolver {
    async fn resolve(&self, url: &str) -> DexResult<DetailRecord> {
        self.source.fetch_detail(url).await
    }
}

/// Memoizes records by locator. Concurrent callers for the same locator
/// share one fetch; failures are not cached.
pub struct MemoResolver {
    source: RemoteSource,
    cells: Mutex<FxHashMap<String, Arc<OnceCell<DetailRecord>>>>,
}

impl MemoResolver {
    pub fn new(source: RemoteSource) -> Self {
        Self { source, cells: Mutex::new(FxHashMap::default()) }
    }

    fn cell(&self, url: &str) -> Arc<OnceCell<DetailRecord>> {
        let mut cells = self.cells.lock().unwrap();
        Arc::clone(cells.entry(url.to_string()).or_default())
    }
}

#[async_trait]
impl DetailResolver for MemoResolver {
    async fn resolve(&self, url: &str) -> DexResult<DetailRecord> {
        let cell = self.cell(url);
        if let Some(rec) = cell.get() {
            metrics::counter!("resolver_cache_hits_total", 1u64);
            return Ok(rec.clone());
        }
        let rec = cell
            .get_or_try_init(|| async {
                metrics::counter!("resolver_cache_misses_total", 1u64);
                debug!(url = %url, "resolver: fetching detail");
                self.source.fetch_detail(url).await
            })
            .await?;
        Ok(rec.clone())
    }
}
