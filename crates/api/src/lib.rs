//! Dex public API façade (in-process).
//!
//! Display layers (CLI, GUI) depend on the `DexApi` trait only: they read the
//! projected list, the load state and the current selection, and push user
//! intents (sort, toggle filter, select) back in.

#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use dex_core::{Collection, DetailRecord, DexResult, Item};
use dex_remote::{HttpTransport, RemoteSource, Transport};
use dex_store::{CollectionStore, Loader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub mod settings;

pub use dex_core::DexError;
pub use dex_store::LoadState;
pub use dex_view::{FilterSet, SortKey, ViewState};
pub use settings::Settings;

/// Declarative Dex API surface.
#[async_trait::async_trait]
pub trait DexApi: Send + Sync {
    /// Walk the whole remote collection and make it current.
    async fn load(&self) -> DexResult<Arc<Collection>>;

    fn load_state(&self) -> LoadState;

    fn subscribe_state(&self) -> watch::Receiver<LoadState>;

    /// Resolve details for every item of the current collection.
    async fn resolve_all(&self) -> DexResult<Arc<Collection>>;

    fn collection(&self) -> Arc<Collection>;

    /// Swap in a copy of the collection ordered by `key` and remember the key.
    fn set_sort(&self, key: SortKey) -> Arc<Collection>;

    /// Returns whether the type is active afterwards.
    fn toggle_filter(&self, type_name: &str) -> bool;

    fn clear_filters(&self);

    fn view(&self) -> Arc<ViewState>;

    /// Ordered, filtered items for display.
    fn project(&self) -> Vec<Item>;

    /// Type names among resolved items, with counts.
    fn facets(&self) -> Vec<(String, usize)>;

    /// Make `item`'s detail record the selection, resolving it if needed.
    async fn select(&self, item: &Item) -> DexResult<DetailRecord>;

    fn selection(&self) -> Option<DetailRecord>;
}

/// In-process implementation over a loader and a collection store.
pub struct InProcApi {
    loader: Arc<Loader>,
    store: Arc<CollectionStore>,
    view: ArcSwap<ViewState>,
    select_seq: AtomicU64,
}

impl InProcApi {
    pub fn new(loader: Arc<Loader>, store: Arc<CollectionStore>) -> Self {
        Self { loader, store, view: ArcSwap::from_pointee(ViewState::default()), select_seq: AtomicU64::new(0) }
    }

    /// Wire an HTTP transport from settings.
    pub fn from_settings(settings: &Settings) -> DexResult<Self> {
        let transport = Arc::new(HttpTransport::new(settings.timeout())?);
        Ok(Self::with_transport(transport, settings))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, settings: &Settings) -> Self {
        let source = RemoteSource::new(transport, settings.endpoint());
        let cfg = settings.loader_config();
        let loader = if settings.memoize { Loader::memoized(source, cfg) } else { Loader::direct(source, cfg) };
        let store = CollectionStore::new(settings.load_mode());
        Self::new(Arc::new(loader), Arc::new(store))
    }

    pub fn loader(&self) -> &Arc<Loader> { &self.loader }
    pub fn store(&self) -> &Arc<CollectionStore> { &self.store }
}

#[async_trait::async_trait]
impl DexApi for InProcApi {
    async fn load(&self) -> DexResult<Arc<Collection>> {
        let t0 = Instant::now();
        info!(url = %self.loader.source().first_page_url(), "api: load start");
        let res = self.store.load(&self.loader).await;
        match &res {
            Ok(c) => info!(count = c.count(), took_ms = %t0.elapsed().as_millis(), "api: load ok"),
            Err(e) => warn!(error = %e, took_ms = %t0.elapsed().as_millis(), "api: load failed"),
        }
        res
    }

    fn load_state(&self) -> LoadState { self.store.state() }

    fn subscribe_state(&self) -> watch::Receiver<LoadState> { self.store.subscribe() }

    async fn resolve_all(&self) -> DexResult<Arc<Collection>> {
        let t0 = Instant::now();
        let res = self.store.resolve_all(&self.loader).await;
        match &res {
            Ok(c) => info!(resolved = c.resolved_count(), took_ms = %t0.elapsed().as_millis(), "api: resolve_all ok"),
            Err(e) => warn!(error = %e, took_ms = %t0.elapsed().as_millis(), "api: resolve_all failed"),
        }
        res
    }

    fn collection(&self) -> Arc<Collection> { self.store.current() }

    fn set_sort(&self, key: SortKey) -> Arc<Collection> {
        let next = dex_view::sorted(&self.store.current(), key);
        let next = self.store.replace(next);
        self.view.rcu(|cur| cur.with_sort(key));
        debug!(?key, "api: sort applied");
        next
    }

    fn toggle_filter(&self, type_name: &str) -> bool {
        let prev = self.view.rcu(|cur| cur.with_filter_toggled(type_name).0);
        let active = !prev.filters.contains(type_name);
        debug!(type_name, active, "api: filter toggled");
        active
    }

    fn clear_filters(&self) {
        self.view.rcu(|cur| cur.with_filters_cleared());
    }

    fn view(&self) -> Arc<ViewState> { self.view.load_full() }

    fn project(&self) -> Vec<Item> {
        self.view.load().project(&self.store.current())
    }

    fn facets(&self) -> Vec<(String, usize)> {
        dex_view::type_facets(&self.store.current())
    }

    async fn select(&self, item: &Item) -> DexResult<DetailRecord> {
        let ticket = self.select_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let rec = match item {
            Item::Detail(d) => d.clone(),
            Item::Summary(s) => {
                debug!(name = %s.name, url = %s.url, "api: resolving selection");
                self.loader.resolve_detail(&s.url).await.map_err(|e| {
                    warn!(name = %s.name, error = %e, "api: select failed");
                    e
                })?
            }
        };
        // A newer select owns the selection. Checked inside the swap loop.
        self.view.rcu(|cur| {
            if self.select_seq.load(Ordering::SeqCst) == ticket {
                cur.with_selection(Some(rec.clone()))
            } else {
                (**cur).clone()
            }
        });
        Ok(rec)
    }

    fn selection(&self) -> Option<DetailRecord> {
        self.view.load().selection.clone()
    }
}
