//! In-memory transport for tests and offline demos.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dex_core::{DexError, DexResult};
use rustc_hash::FxHashMap;
use serde_json::{json, Value};

use crate::Transport;

#[derive(Clone)]
enum Route {
    Json { body: Value, delay: Option<Duration> },
    Fail(DexError),
}

/// Url → canned response map with per-url call counters.
/// Unknown urls answer `NotFound`.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<FxHashMap<String, Route>>,
    calls: Mutex<FxHashMap<String, usize>>,
}

impl MockTransport {
    pub fn new() -> Self { Self::default() }

    pub fn with_json(self, url: impl Into<String>, body: Value) -> Self {
        self.insert_json(url, body);
        self
    }

    pub fn insert_json(&self, url: impl Into<String>, body: Value) {
        self.routes.lock().unwrap().insert(url.into(), Route::Json { body, delay: None });
    }

    pub fn insert_delayed(&self, url: impl Into<String>, body: Value, delay: Duration) {
        self.routes.lock().unwrap().insert(url.into(), Route::Json { body, delay: Some(delay) });
    }

    pub fn insert_error(&self, url: impl Into<String>, err: DexError) {
        self.routes.lock().unwrap().insert(url.into(), Route::Fail(err));
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, url: &str) -> DexResult<Value> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let route = self.routes.lock().unwrap().get(url).cloned();
        match route {
            Some(Route::Json { body, delay }) => {
                if let Some(d) = delay { tokio::time::sleep(d).await; }
                Ok(body)
            }
            Some(Route::Fail(e)) => Err(e),
            None => Err(DexError::NotFound(url.to_string())),
        }
    }
}

/// Collection page body in the remote's shape.
pub fn page_json(count: usize, next: Option<&str>, items: &[(&str, &str)]) -> Value {
    let results: Vec<Value> = items.iter().map(|(name, url)| json!({ "name": name, "url": url })).collect();
    json!({ "count": count, "next": next, "previous": null, "results": results })
}

/// Detail body in the remote's shape.
pub fn detail_json(id: u32, name: &str, types: &[&str], abilities: &[&str]) -> Value {
    let types: Vec<Value> = types
        .iter()
        .enumerate()
        .map(|(i, t)| json!({ "slot": i + 1, "type": { "name": t, "url": format!("https://example.test/type/{}/", t) } }))
        .collect();
    let abilities: Vec<Value> = abilities
        .iter()
        .enumerate()
        .map(|(i, a)| json!({ "slot": i + 1, "is_hidden": false, "ability": { "name": a, "url": format!("https://example.test/ability/{}/", a) } }))
        .collect();
    json!({ "id": id, "name": name, "height": 10 + id, "weight": 100 + id, "abilities": abilities, "types": types })
}

/// Registers a chained walk under `base/resource` with the given page sizes.
/// Items are named `mon-<n>` (1-based) with details at `base/resource/<n>/`.
/// Returns the url of every item in walk order.
pub fn seed_pages(mock: &MockTransport, base: &str, resource: &str, sizes: &[usize]) -> Vec<String> {
    let total: usize = sizes.iter().sum();
    let first = format!("{}/{}", base, resource);
    let mut urls = Vec::with_capacity(total);
    let mut n = 0usize;
    for (p, size) in sizes.iter().enumerate() {
        let page_url = if p == 0 { first.clone() } else { format!("{}?offset={}", first, n) };
        let next = if p + 1 < sizes.len() { Some(format!("{}?offset={}", first, n + size)) } else { None };
        let mut names = Vec::with_capacity(*size);
        for _ in 0..*size {
            n += 1;
            let url = format!("{}/{}/", first, n);
            names.push((format!("mon-{}", n), url.clone()));
            urls.push(url);
        }
        let pairs: Vec<(&str, &str)> = names.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        mock.insert_json(page_url, page_json(total, next.as_deref(), &pairs));
    }
    if sizes.is_empty() {
        mock.insert_json(first, page_json(0, None, &[]));
    }
    urls
}
