//! Dex store: collection loader plus the in-RAM collection with its load
//! state machine.

#![forbid(unsafe_code)]

use std::sync::Arc;

use arc_swap::ArcSwap;
use dex_core::{Collection, DexError, DexResult};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub mod loader;
pub mod resolver;

pub use loader::{Loader, LoaderConfig};
pub use resolver::{DetailResolver, DirectResolver, MemoResolver};

/// `Idle → Loading → {Loaded | Failed}`; a new trigger moves back to `Loading`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded { count: usize },
    Failed(DexError),
}

impl LoadState {
    pub fn is_settled(&self) -> bool {
        matches!(self, LoadState::Loaded { .. } | LoadState::Failed(_))
    }
}

/// What a load trigger does while another load is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Start an independent load; whichever finishes last wins.
    #[default]
    Concurrent,
    /// Wait for the running load and share its outcome.
    SingleFlight,
}

/// Holds the current collection and publishes load state.
/// Only whole collections are swapped in.
pub struct CollectionStore {
    snap: ArcSwap<Collection>,
    state_tx: watch::Sender<LoadState>,
    mode: LoadMode,
    flight: Mutex<()>,
}

impl Default for CollectionStore {
    fn default() -> Self { Self::new(LoadMode::default()) }
}

impl CollectionStore {
    pub fn new(mode: LoadMode) -> Self {
        let (state_tx, _) = watch::channel(LoadState::Idle);
        Self {
            snap: ArcSwap::from_pointee(Collection::default()),
            state_tx,
            mode,
            flight: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> LoadMode { self.mode }

    pub fn current(&self) -> Arc<Collection> { self.snap.load_full() }

    /// Swap in a new collection and return it.
    pub fn replace(&self, next: Collection) -> Arc<Collection> {
        let next = Arc::new(next);
        self.snap.store(Arc::clone(&next));
        debug!(count = next.count(), "store: collection swapped");
        next
    }

    pub fn state(&self) -> LoadState { self.state_tx.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> { self.state_tx.subscribe() }

    /// Run a full page walk and swap the result in. On failure the previous
    /// collection stays and the state becomes `Failed`.
    pub async fn load(&self, loader: &Loader) -> DexResult<Arc<Collection>> {
        match self.mode {
            LoadMode::Concurrent => self.run_load(loader).await,
            LoadMode::SingleFlight => match self.flight.try_lock() {
                Ok(_guard) => self.run_load(loader).await,
                Err(_) => {
                    debug!("store: load already in flight; joining");
                    let _guard = self.flight.lock().await;
                    self.settled()
                }
            },
        }
    }

    /// Resolve every item of the current collection and swap the result in.
    ///
    /// The swap only happens if the snapshot is still the one that was
    /// resolved; a collection swapped in meanwhile is kept and the resolved
    /// copy is only returned to the caller.
    pub async fn resolve_all(&self, loader: &Loader) -> DexResult<Arc<Collection>> {
        let cur = self.current();
        let resolved = Arc::new(loader.resolve_all(&cur).await?);
        let prev = self.snap.compare_and_swap(&cur, Arc::clone(&resolved));
        if Arc::ptr_eq(&*prev, &cur) {
            debug!(count = resolved.count(), "store: resolved collection swapped");
        } else {
            warn!(count = resolved.count(), "store: collection changed during resolve_all; keeping the newer one");
        }
        Ok(resolved)
    }

    /// Fire-and-forget load; progress is visible through `subscribe`.
    pub fn spawn_load(self: &Arc<Self>, loader: Arc<Loader>) -> JoinHandle<DexResult<Arc<Collection>>> {
        let store = Arc::clone(self);
        tokio::spawn(async move { store.load(&loader).await })
    }

    async fn run_load(&self, loader: &Loader) -> DexResult<Arc<Collection>> {
        self.state_tx.send_replace(LoadState::Loading);
        match loader.load_all().await {
            Ok(c) => {
                let count = c.count();
                let next = self.replace(c);
                self.state_tx.send_replace(LoadState::Loaded { count });
                info!(count, "store: load ok");
                Ok(next)
            }
            Err(e) => {
                warn!(error = %e, "store: load failed");
                self.state_tx.send_replace(LoadState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    fn settled(&self) -> DexResult<Arc<Collection>> {
        match self.state() {
            LoadState::Failed(e) => Err(e),
            _ => Ok(self.current()),
        }
    }
}
