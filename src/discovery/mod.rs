//! Pluggable sources of candidate PDF URLs.
//!
//! - [`DiscoveryEngine`] - async trait each source implements
//! - [`DiscoveryRegistry`] - runs every engine that handles a query, isolating failures
//! - [`SearchEngineScraper`] - result-page scraping (DuckDuckGo, Bing, Google)
//! - [`SeedPageCrawler`] - PDF links from one configured page
//! - [`BraveSearchEngine`] - structured API search, disabled without a key
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pdf_harvest::discovery::{DiscoveryQuery, build_default_registry};
//! use pdf_harvest::fetch::{FetchClient, RateLimits, RobotsGate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FetchClient::new(
//!     Arc::new(RateLimits::new(10, Duration::from_secs(10))),
//!     Arc::new(RobotsGate::new("pdf-harvest")),
//! )?;
//! let registry = build_default_registry(true, None);
//! let query = DiscoveryQuery::term("switch configuration guide", "networking");
//! for candidate in registry.discover_all(&query, &client).await {
//!     println!("{} via {}", candidate.url, candidate.engine);
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod error;
mod registry;
mod retry;
mod search;
mod seed;
mod unwrap;

pub use api::{API_KEY_ENV, BraveSearchEngine};
pub use error::DiscoveryError;
pub use registry::DiscoveryRegistry;
pub use retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};
pub use search::{
    FILETYPE_HINT, SearchBackend, SearchBackendKind, SearchEngineScraper, parse_results,
};
pub use seed::{SeedPageCrawler, extract_pdf_links};
pub use unwrap::{search_engine_for_host, unwrap_redirect};

use async_trait::async_trait;

use crate::fetch::FetchClient;

/// What to discover candidates for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryQuery {
    /// A search term from the catalog.
    Term { term: String, category: String },
    /// A page whose PDF links are collected directly.
    Seed { url: String, category: String },
}

impl DiscoveryQuery {
    #[must_use]
    pub fn term(term: impl Into<String>, category: impl Into<String>) -> Self {
        Self::Term {
            term: term.into(),
            category: category.into(),
        }
    }

    #[must_use]
    pub fn seed(url: impl Into<String>, category: impl Into<String>) -> Self {
        Self::Seed {
            url: url.into(),
            category: category.into(),
        }
    }

    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::Term { category, .. } | Self::Seed { category, .. } => category,
        }
    }

    /// The term or seed URL, for logs and provenance.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Term { term, .. } => term,
            Self::Seed { url, .. } => url,
        }
    }

    /// The search term, if this is a term query.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        match self {
            Self::Term { term, .. } => Some(term),
            Self::Seed { .. } => None,
        }
    }
}

/// A discovered URL with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    /// Name of the engine that found it.
    pub engine: String,
    /// Search term, if discovered by a term query.
    pub term: Option<String>,
    pub category: String,
}

impl Candidate {
    #[must_use]
    pub fn new(url: impl Into<String>, engine: impl Into<String>, query: &DiscoveryQuery) -> Self {
        Self {
            url: url.into(),
            engine: engine.into(),
            term: query.search_term().map(str::to_string),
            category: query.category().to_string(),
        }
    }
}

/// A source of candidate URLs.
///
/// Uses `async_trait` so engines can live in the registry as
/// `Box<dyn DiscoveryEngine>`.
#[async_trait]
pub trait DiscoveryEngine: Send + Sync {
    /// Short engine name recorded as provenance.
    fn name(&self) -> &str;

    /// Returns true if the engine applies to this query kind.
    fn handles(&self, query: &DiscoveryQuery) -> bool;

    /// Returns candidate URLs for the query.
    async fn discover(
        &self,
        query: &DiscoveryQuery,
        client: &FetchClient,
    ) -> Result<Vec<String>, DiscoveryError>;
}

/// Builds the registry used by the CLI run loop.
///
/// Order: structured API (when keyed), search scraping (unless disabled),
/// seed crawling.
#[must_use]
pub fn build_default_registry(scrape_search: bool, api_key: Option<String>) -> DiscoveryRegistry {
    let mut registry = DiscoveryRegistry::new();
    let api = BraveSearchEngine::new(api_key);
    if api.is_enabled() {
        registry.register(Box::new(api));
    } else {
        tracing::debug!("{API_KEY_ENV} not set - structured search disabled");
    }
    if scrape_search {
        registry.register(Box::new(SearchEngineScraper::default()));
    }
    registry.register(Box::new(SeedPageCrawler::new()));
    registry
}
