//! Search-engine result page scraping.
//!
//! Backends are tried in order. Each gets a bounded number of attempts with
//! randomized backoff on non-200 responses; the first backend that yields at
//! least one PDF-looking URL ends the scrape for that term.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::DiscoveryError;
use super::retry::RetryPolicy;
use super::unwrap::{
    extract_bing, extract_duckduckgo, extract_google, search_engine_for_host, unwrap_redirect,
};
use super::{DiscoveryEngine, DiscoveryQuery};
use crate::classify::looks_like_pdf;
use crate::fetch::{FetchClient, FetchError, FetchRequest, parse_retry_after};
use crate::util::absolutize_url;

/// Results pages larger than this are refused.
const MAX_RESULTS_PAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Query hint restricting results to PDF documents.
pub const FILETYPE_HINT: &str = "filetype:pdf";

static ANCHOR_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("a[href]").ok());

/// Supported result-page formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackendKind {
    DuckDuckGo,
    Bing,
    Google,
}

impl SearchBackendKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DuckDuckGo => "duckduckgo",
            Self::Bing => "bing",
            Self::Google => "google",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::DuckDuckGo => "https://html.duckduckgo.com",
            Self::Bing => "https://www.bing.com",
            Self::Google => "https://www.google.com",
        }
    }

    fn search_path(self) -> &'static str {
        match self {
            Self::DuckDuckGo => "/html/",
            Self::Bing | Self::Google => "/search",
        }
    }

    fn extract(self, url: &Url) -> Option<String> {
        match self {
            Self::DuckDuckGo => extract_duckduckgo(url),
            Self::Bing => extract_bing(url),
            Self::Google => extract_google(url),
        }
    }
}

/// One search endpoint.
#[derive(Debug, Clone)]
pub struct SearchBackend {
    kind: SearchBackendKind,
    base_url: String,
}

impl SearchBackend {
    /// Backend at its public endpoint.
    #[must_use]
    pub fn new(kind: SearchBackendKind) -> Self {
        Self::with_base_url(kind, kind.default_base_url())
    }

    /// Backend at a custom base URL (used by tests with mock servers).
    #[must_use]
    pub fn with_base_url(kind: SearchBackendKind, base_url: impl Into<String>) -> Self {
        Self {
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SearchBackendKind {
        self.kind
    }

    /// Builds the results-page URL for a term, with the filetype hint appended.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Malformed`] if the base URL is invalid.
    pub fn query_url(&self, term: &str) -> Result<Url, DiscoveryError> {
        let query = format!("{} {FILETYPE_HINT}", term.trim());
        let endpoint = format!("{}{}", self.base_url, self.kind.search_path());
        let mut params = vec![("q", query)];
        if self.kind == SearchBackendKind::Google {
            params.push(("num", "20".to_string()));
        }
        Url::parse_with_params(&endpoint, &params)
            .map_err(|e| DiscoveryError::malformed(self.kind.name(), &endpoint, e.to_string()))
    }
}

/// Extracts PDF-looking destinations from a results page, in page order.
#[must_use]
pub fn parse_results(html: &str, page_url: &Url, kind: SearchBackendKind) -> Vec<String> {
    let Some(selector) = ANCHOR_SELECTOR.as_ref() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let page_host = page_url.host_str().unwrap_or_default();

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for anchor in document.select(selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(absolute) = absolutize_url(href, page_url) else {
            continue;
        };
        let Ok(parsed) = Url::parse(&absolute) else {
            continue;
        };

        let destination = if parsed.host_str() == Some(page_host) {
            kind.extract(&parsed)
        } else {
            unwrap_redirect(&absolute)
        };
        let Some(destination) = destination else {
            continue;
        };

        let on_engine = Url::parse(&destination)
            .ok()
            .and_then(|url| url.host_str().map(|host| search_engine_for_host(host).is_some()))
            .unwrap_or(true);
        if on_engine || !looks_like_pdf(&destination) {
            continue;
        }
        if seen.insert(destination.clone()) {
            found.push(destination);
        }
    }
    found
}

/// Scrapes search-engine result pages for PDF links.
#[derive(Debug, Clone)]
pub struct SearchEngineScraper {
    backends: Vec<SearchBackend>,
    retry: RetryPolicy,
}

impl Default for SearchEngineScraper {
    fn default() -> Self {
        Self::new(vec![
            SearchBackend::new(SearchBackendKind::DuckDuckGo),
            SearchBackend::new(SearchBackendKind::Bing),
            SearchBackend::new(SearchBackendKind::Google),
        ])
    }
}

impl SearchEngineScraper {
    #[must_use]
    pub fn new(backends: Vec<SearchBackend>) -> Self {
        Self {
            backends,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn backends(&self) -> &[SearchBackend] {
        &self.backends
    }

    #[instrument(skip(self, client), fields(backend = backend.kind.name()))]
    async fn scrape_backend(
        &self,
        backend: &SearchBackend,
        term: &str,
        client: &FetchClient,
    ) -> Result<Vec<String>, DiscoveryError> {
        let engine = backend.kind.name();
        let url = backend.query_url(term)?;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let (retry_after, failure) = match client.fetch(url.as_str(), FetchRequest::get()).await {
                Ok(response) if response.status() == 200 => {
                    let page = response
                        .read_capped(MAX_RESULTS_PAGE_BYTES)
                        .await
                        .map_err(|e| DiscoveryError::fetch(engine, e))?;
                    let page_url = Url::parse(&page.final_url).unwrap_or_else(|_| url.clone());
                    let found = parse_results(&page.text(), &page_url, backend.kind);
                    debug!(count = found.len(), "parsed results page");
                    return Ok(found);
                }
                Ok(response) => {
                    let status = response.status();
                    let retry_after = response
                        .header(RETRY_AFTER.as_str())
                        .and_then(parse_retry_after);
                    (retry_after, DiscoveryError::status(engine, url.as_str(), status))
                }
                Err(error @ (FetchError::RobotsDisallowed { .. } | FetchError::InvalidUrl { .. })) => {
                    return Err(DiscoveryError::fetch(engine, error));
                }
                Err(error) => (None, DiscoveryError::fetch(engine, error)),
            };

            match self.retry.next_delay(attempt, retry_after) {
                Some(delay) => {
                    debug!(attempt, delay_ms = delay.as_millis(), error = %failure, "retrying search");
                    tokio::time::sleep(delay).await;
                }
                None => return Err(failure),
            }
        }
    }
}

#[async_trait]
impl DiscoveryEngine for SearchEngineScraper {
    fn name(&self) -> &str {
        "search"
    }

    fn handles(&self, query: &DiscoveryQuery) -> bool {
        matches!(query, DiscoveryQuery::Term { .. })
    }

    async fn discover(
        &self,
        query: &DiscoveryQuery,
        client: &FetchClient,
    ) -> Result<Vec<String>, DiscoveryError> {
        let DiscoveryQuery::Term { term, .. } = query else {
            return Ok(Vec::new());
        };

        let mut any_answered = false;
        let mut last_error = None;
        for backend in &self.backends {
            match self.scrape_backend(backend, term, client).await {
                Ok(urls) if !urls.is_empty() => {
                    info!(backend = backend.kind.name(), term = %term, count = urls.len(), "search results");
                    return Ok(urls);
                }
                Ok(_) => {
                    any_answered = true;
                    debug!(backend = backend.kind.name(), term = %term, "no PDF results");
                }
                Err(error) => {
                    warn!(backend = backend.kind.name(), term = %term, error = %error, "search backend failed");
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) if !any_answered => Err(error),
            _ => Ok(Vec::new()),
        }
    }
}
