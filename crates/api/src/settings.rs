//! Runtime settings, read from `DEX_*` environment variables.

use std::time::Duration;

use dex_remote::Endpoint;
use dex_store::{LoadMode, LoaderConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_RESOURCE: &str = "pokemon";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub resource: String,
    pub page_limit: Option<u32>,
    pub max_pages: usize,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub memoize: bool,
    pub single_flight: bool,
    pub metrics_addr: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let loader = LoaderConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            resource: DEFAULT_RESOURCE.to_string(),
            page_limit: None,
            max_pages: loader.max_pages,
            concurrency: loader.concurrency,
            timeout_secs: 30,
            memoize: true,
            single_flight: false,
            metrics_addr: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            base_url: get("DEX_BASE_URL").filter(|s| !s.is_empty()).unwrap_or(d.base_url),
            resource: get("DEX_RESOURCE").filter(|s| !s.is_empty()).unwrap_or(d.resource),
            page_limit: get("DEX_PAGE_LIMIT").and_then(|s| s.parse().ok()).or(d.page_limit),
            max_pages: get("DEX_MAX_PAGES").and_then(|s| s.parse().ok()).unwrap_or(d.max_pages),
            concurrency: get("DEX_CONCURRENCY").and_then(|s| s.parse().ok()).unwrap_or(d.concurrency),
            timeout_secs: get("DEX_TIMEOUT_SECS").and_then(|s| s.parse().ok()).unwrap_or(d.timeout_secs),
            memoize: get("DEX_MEMOIZE").and_then(|s| parse_flag(&s)).unwrap_or(d.memoize),
            single_flight: get("DEX_SINGLE_FLIGHT").and_then(|s| parse_flag(&s)).unwrap_or(d.single_flight),
            metrics_addr: get("DEX_METRICS_ADDR").filter(|s| !s.is_empty()),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.base_url.clone(), self.resource.clone()).with_page_limit(self.page_limit)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig { max_pages: self.max_pages.max(1), concurrency: self.concurrency.max(1) }
    }

    pub fn load_mode(&self) -> LoadMode {
        if self.single_flight { LoadMode::SingleFlight } else { LoadMode::Concurrent }
    }

    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
