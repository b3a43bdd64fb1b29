//! Structured search through the Brave Search API.
//!
//! Enabled only when an API key is configured; without one the engine returns
//! no candidates and makes no requests.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use super::error::DiscoveryError;
use super::search::FILETYPE_HINT;
use super::{DiscoveryEngine, DiscoveryQuery};
use crate::classify::has_pdf_suffix;
use crate::fetch::{FetchClient, FetchRequest};

const ENGINE_NAME: &str = "brave_api";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "BRAVE_SEARCH_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.search.brave.com";
const SEARCH_PATH: &str = "/res/v1/web/search";
const RESULT_COUNT: &str = "20";
const MAX_RESPONSE_BYTES: u64 = 2 * 1024 * 1024;

const SUBSCRIPTION_TOKEN_HEADER: &str = "x-subscription-token";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    url: String,
}

/// Extracts `.pdf` result URLs from a Brave web search response body.
///
/// # Errors
///
/// Returns the JSON error if the body is not a search response.
pub fn parse_response(body: &[u8]) -> Result<Vec<String>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_slice(body)?;
    Ok(response
        .web
        .map(|web| web.results)
        .unwrap_or_default()
        .into_iter()
        .map(|result| result.url)
        .filter(|url| has_pdf_suffix(url))
        .collect())
}

/// Brave Search API engine.
#[derive(Clone)]
pub struct BraveSearchEngine {
    api_key: Option<String>,
    base_url: String,
}

impl std::fmt::Debug for BraveSearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BraveSearchEngine")
            .field("enabled", &self.api_key.is_some())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BraveSearchEngine {
    /// Engine using `key`; an empty or missing key disables it.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Engine at a custom endpoint (used by tests with mock servers).
    #[must_use]
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl DiscoveryEngine for BraveSearchEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn handles(&self, query: &DiscoveryQuery) -> bool {
        matches!(query, DiscoveryQuery::Term { .. })
    }

    #[instrument(skip(self, client))]
    async fn discover(
        &self,
        query: &DiscoveryQuery,
        client: &FetchClient,
    ) -> Result<Vec<String>, DiscoveryError> {
        let DiscoveryQuery::Term { term, .. } = query else {
            return Ok(Vec::new());
        };
        let Some(key) = self.api_key.as_deref() else {
            debug!("no API key configured - skipping structured search");
            return Ok(Vec::new());
        };

        let endpoint = format!("{}{SEARCH_PATH}", self.base_url);
        let url = Url::parse_with_params(
            &endpoint,
            &[
                ("q", format!("{} {FILETYPE_HINT}", term.trim()).as_str()),
                ("count", RESULT_COUNT),
            ],
        )
        .map_err(|e| DiscoveryError::malformed(ENGINE_NAME, &endpoint, e.to_string()))?;

        let token = HeaderValue::from_str(key)
            .map_err(|e| DiscoveryError::malformed(ENGINE_NAME, &endpoint, e.to_string()))?;
        let request = FetchRequest::get()
            .with_header(ACCEPT, HeaderValue::from_static("application/json"))
            .with_header(HeaderName::from_static(SUBSCRIPTION_TOKEN_HEADER), token);

        let response = client
            .fetch(url.as_str(), request)
            .await
            .map_err(|e| DiscoveryError::fetch(ENGINE_NAME, e))?;
        if response.status() != 200 {
            return Err(DiscoveryError::status(ENGINE_NAME, url.as_str(), response.status()));
        }
        let body = response
            .read_capped(MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| DiscoveryError::fetch(ENGINE_NAME, e))?;

        let urls = parse_response(&body.body)
            .map_err(|e| DiscoveryError::malformed(ENGINE_NAME, url.as_str(), e.to_string()))?;
        info!(term = %term, count = urls.len(), "structured search results");
        Ok(urls)
    }
}
