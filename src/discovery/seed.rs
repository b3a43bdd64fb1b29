//! Seed-page crawling: PDF links from one known HTML page, no further traversal.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{info, instrument};
use url::Url;

use super::error::DiscoveryError;
use super::{DiscoveryEngine, DiscoveryQuery};
use crate::fetch::{FetchClient, FetchRequest};
use crate::util::{absolutize_url, compile_static_regex};

const ENGINE_NAME: &str = "seed";

/// Seed pages larger than this are refused.
const MAX_SEED_PAGE_BYTES: u64 = 5 * 1024 * 1024;

static PDF_HREF_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?i)\.pdf(\?.*)?$"));

static ANCHOR_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("a[href]").ok());

/// Absolute PDF links on an HTML page, in document order without duplicates.
#[must_use]
pub fn extract_pdf_links(html: &str, page_url: &Url) -> Vec<String> {
    let Some(selector) = ANCHOR_SELECTOR.as_ref() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    document
        .select(selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| PDF_HREF_RE.is_match(href))
        .filter_map(|href| absolutize_url(href, page_url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Fetches a configured seed page and lists the PDFs it links to.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedPageCrawler;

impl SeedPageCrawler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiscoveryEngine for SeedPageCrawler {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn handles(&self, query: &DiscoveryQuery) -> bool {
        matches!(query, DiscoveryQuery::Seed { .. })
    }

    #[instrument(skip(self, client), fields(seed))]
    async fn discover(
        &self,
        query: &DiscoveryQuery,
        client: &FetchClient,
    ) -> Result<Vec<String>, DiscoveryError> {
        let DiscoveryQuery::Seed { url, .. } = query else {
            return Ok(Vec::new());
        };
        tracing::Span::current().record("seed", url.as_str());

        let response = client
            .fetch(url, FetchRequest::get())
            .await
            .map_err(|e| DiscoveryError::fetch(ENGINE_NAME, e))?;
        if !(200..300).contains(&response.status()) {
            return Err(DiscoveryError::status(ENGINE_NAME, url, response.status()));
        }

        let content_type = response.header("content-type").unwrap_or_default().to_string();
        if !content_type.to_ascii_lowercase().contains("text/html") {
            return Err(DiscoveryError::not_html(ENGINE_NAME, url, content_type));
        }

        let page = response
            .read_capped(MAX_SEED_PAGE_BYTES)
            .await
            .map_err(|e| DiscoveryError::fetch(ENGINE_NAME, e))?;
        let base = Url::parse(&page.final_url)
            .map_err(|e| DiscoveryError::malformed(ENGINE_NAME, &page.final_url, e.to_string()))?;

        let links = extract_pdf_links(&page.text(), &base);
        info!(seed = %url, count = links.len(), "seed page links");
        Ok(links)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fetch::{RateLimits, RobotsGate};
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[test]
    fn test_extract_pdf_links_filters_and_resolves() {
        let base = Url::parse("https://example.gov/docs/index.html").unwrap();
        let html = r#"
            <a href="manual.pdf">Manual</a>
            <a href="/files/Guide.PDF?rev=2">Guide</a>
            <a href="https://cdn.example.gov/sheet.pdf">Sheet</a>
            <a href="page.html">Page</a>
            <a href="archive.pdf.zip">Zip</a>
            <a href="manual.pdf">Manual again</a>
        "#;
        assert_eq!(
            extract_pdf_links(html, &base),
            vec![
                "https://example.gov/docs/manual.pdf",
                "https://example.gov/files/Guide.PDF?rev=2",
                "https://cdn.example.gov/sheet.pdf",
            ]
        );
    }

    #[tokio::test]
    async fn test_seed_crawler_resolves_against_final_url() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/library/"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/library/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"<a href="a.pdf">A</a><a href="b.txt">B</a>"#, "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let client = FetchClient::new(
            Arc::new(RateLimits::disabled()),
            Arc::new(RobotsGate::new("pdf-harvest")),
        )
        .unwrap();
        let query = DiscoveryQuery::seed(format!("{}/start", server.uri()), "seeds");
        let links = SeedPageCrawler::new().discover(&query, &client).await.unwrap();
        assert_eq!(links, vec![format!("{}/library/a.pdf", server.uri())]);
    }

    #[tokio::test]
    async fn test_seed_crawler_rejects_non_html() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"href":"x.pdf"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let client = FetchClient::new(
            Arc::new(RateLimits::disabled()),
            Arc::new(RobotsGate::new("pdf-harvest")),
        )
        .unwrap();
        let query = DiscoveryQuery::seed(format!("{}/feed", server.uri()), "seeds");
        let result = SeedPageCrawler::new().discover(&query, &client).await;
        assert!(matches!(result, Err(DiscoveryError::NotHtml { .. })));
    }
}
