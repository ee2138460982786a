//! Dex remote source: transport seam, HTTP transport and wire decoding.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dex_core::{DetailRecord, DexError, DexResult, Named};
use serde::Deserialize;
use tracing::{debug, warn};

pub mod mock;

/// Generic request function: GET a locator and return its JSON body.
///
/// Implementations map failures onto the shared taxonomy: 404 becomes
/// `NotFound`, transport trouble and other statuses become `Network`, and
/// bodies that are not JSON become `MalformedResponse`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str) -> DexResult<serde_json::Value>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> DexResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DexError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> DexResult<serde_json::Value> {
        let started = Instant::now();
        let resp = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "remote: request failed");
            metrics::counter!("remote_requests_total", 1u64, "status" => "error");
            DexError::Network(e.to_string())
        })?;
        let status = resp.status();
        metrics::histogram!("remote_request_ms", started.elapsed().as_secs_f64() * 1000.0);
        metrics::counter!("remote_requests_total", 1u64, "status" => status.as_u16().to_string());
        debug!(url = %url, status = status.as_u16(), took_ms = %started.elapsed().as_millis(), "remote: response");
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DexError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(DexError::Network(format!("{} returned {}", url, status)));
        }
        let body = resp.bytes().await.map_err(|e| DexError::Network(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| DexError::MalformedResponse(format!("{}: {}", url, e)))
    }
}

// ---- wire formats ----

/// One page of the collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PageDoc {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<SummaryDoc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SummaryDoc {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AbilitySlot {
    ability: NamedRef,
}

#[derive(Debug, Clone, Deserialize)]
struct TypeSlot {
    #[serde(rename = "type")]
    kind: NamedRef,
}

#[derive(Debug, Clone, Deserialize)]
struct DetailDoc {
    id: u32,
    name: String,
    height: u32,
    weight: u32,
    abilities: Vec<AbilitySlot>,
    types: Vec<TypeSlot>,
}

impl DetailDoc {
    fn into_record(self, url: &str) -> DetailRecord {
        DetailRecord {
            id: self.id,
            name: self.name,
            url: url.to_string(),
            height: self.height,
            weight: self.weight,
            abilities: self.abilities.into_iter().map(|a| Named { name: a.ability.name }).collect(),
            types: self.types.into_iter().map(|t| Named { name: t.kind.name }).collect(),
        }
    }
}

/// Decoded page: items in remote order plus the continuation, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<SummaryDoc>,
    /// `None` when the remote sent no `next` or an empty one.
    pub next: Option<String>,
}

impl From<PageDoc> for Page {
    fn from(doc: PageDoc) -> Self {
        let next = doc.next.filter(|s| !s.trim().is_empty());
        Self { items: doc.results, next }
    }
}

/// Where the collection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub resource: String,
    /// Page size hint sent as `?limit=N`; `None` leaves it to the server.
    pub page_limit: Option<u32>,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, resource: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), resource: resource.into(), page_limit: None }
    }

    pub fn with_page_limit(mut self, limit: Option<u32>) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn collection_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let resource = self.resource.trim_matches('/');
        match self.page_limit {
            Some(n) => format!("{}/{}?limit={}", base, resource, n),
            None => format!("{}/{}", base, resource),
        }
    }
}

/// Typed access to the collection and detail endpoints over a transport.
#[derive(Clone)]
pub struct RemoteSource {
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
}

impl RemoteSource {
    pub fn new(transport: Arc<dyn Transport>, endpoint: Endpoint) -> Self {
        Self { transport, endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint { &self.endpoint }

    pub fn first_page_url(&self) -> String { self.endpoint.collection_url() }

    pub async fn fetch_page(&self, url: &str) -> DexResult<Page> {
        let raw = self.transport.get_json(url).await?;
        let doc: PageDoc = serde_json::from_value(raw)
            .map_err(|e| DexError::MalformedResponse(format!("page {}: {}", url, e)))?;
        debug!(url = %url, items = doc.results.len(), has_next = doc.next.is_some(), remote_count = ?doc.count, "remote: page decoded");
        Ok(doc.into())
    }

    pub async fn fetch_detail(&self, url: &str) -> DexResult<DetailRecord> {
        let raw = self.transport.get_json(url).await?;
        let doc: DetailDoc = serde_json::from_value(raw)
            .map_err(|e| DexError::MalformedResponse(format!("detail {}: {}", url, e)))?;
        Ok(doc.into_record(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_url_shapes() {
        let ep = Endpoint::new("https://pokeapi.co/api/v2/", "/pokemon");
        assert_eq!(ep.collection_url(), "https://pokeapi.co/api/v2/pokemon");
        let ep = ep.with_page_limit(Some(50));
        assert_eq!(ep.collection_url(), "https://pokeapi.co/api/v2/pokemon?limit=50");
    }

    #[test]
    fn empty_next_means_last_page() {
        let doc: PageDoc = serde_json::from_value(serde_json::json!({
            "count": 1, "next": "", "previous": null,
            "results": [{ "name": "a", "url": "u" }]
        }))
        .unwrap();
        let page: Page = doc.into();
        assert_eq!(page.next, None);
        assert_eq!(page.items.len(), 1);

        let doc: PageDoc = serde_json::from_value(serde_json::json!({ "results": [] })).unwrap();
        assert_eq!(Page::from(doc).next, None);
    }

    #[test]
    fn detail_keeps_slot_order() {
        let doc: DetailDoc = serde_json::from_value(mock::detail_json(6, "charizard", &["fire", "flying"], &["blaze", "solar-power"])).unwrap();
        let rec = doc.into_record("https://example.test/pokemon/6/");
        assert_eq!(rec.url, "https://example.test/pokemon/6/");
        assert_eq!(rec.type_names().collect::<Vec<_>>(), vec!["fire", "flying"]);
        assert_eq!(rec.ability_names().collect::<Vec<_>>(), vec!["blaze", "solar-power"]);
    }
}
