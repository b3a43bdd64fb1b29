//! Destination extraction from search-engine redirect wrappers.
//!
//! Every extractor is a pure string transform; nothing here touches the
//! network.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use url::Url;

use crate::util::{canonical_host, host_within};

type Extractor = fn(&Url) -> Option<String>;

struct Unwrapper {
    engine: &'static str,
    matches_host: fn(&str) -> bool,
    extract: Extractor,
}

const UNWRAPPERS: &[Unwrapper] = &[
    Unwrapper {
        engine: "duckduckgo",
        matches_host: is_duckduckgo_host,
        extract: extract_duckduckgo,
    },
    Unwrapper {
        engine: "bing",
        matches_host: is_bing_host,
        extract: extract_bing,
    },
    Unwrapper {
        engine: "google",
        matches_host: is_google_host,
        extract: extract_google,
    },
];

fn is_duckduckgo_host(host: &str) -> bool {
    host_within(host, "duckduckgo.com")
}

fn is_bing_host(host: &str) -> bool {
    host_within(host, "bing.com")
}

fn is_google_host(host: &str) -> bool {
    let host = canonical_host(host);
    host.split('.').next() == Some("google") && host.contains('.')
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn absolute_http(candidate: &str) -> Option<String> {
    let parsed = Url::parse(candidate).ok()?;
    matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
}

/// `https://duckduckgo.com/l/?uddg=<percent-encoded destination>`
pub(crate) fn extract_duckduckgo(url: &Url) -> Option<String> {
    if !matches!(url.path(), "/l" | "/l/") {
        return None;
    }
    query_param(url, "uddg").and_then(|target| absolute_http(&target))
}

/// `https://www.google.com/url?q=<destination>` (or `url=`)
pub(crate) fn extract_google(url: &Url) -> Option<String> {
    if url.path() != "/url" {
        return None;
    }
    query_param(url, "q")
        .or_else(|| query_param(url, "url"))
        .and_then(|target| absolute_http(&target))
}

/// `https://www.bing.com/ck/a?...&u=a1<base64url destination>`
pub(crate) fn extract_bing(url: &Url) -> Option<String> {
    if !url.path().starts_with("/ck/a") {
        return None;
    }
    let encoded = query_param(url, "u")?;
    let payload = encoded.strip_prefix("a1").unwrap_or(&encoded);
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let target = String::from_utf8(decoded).ok()?;
    absolute_http(&target)
}

/// Returns the engine name if `host` belongs to a known search engine.
#[must_use]
pub fn search_engine_for_host(host: &str) -> Option<&'static str> {
    UNWRAPPERS
        .iter()
        .find(|unwrapper| (unwrapper.matches_host)(host))
        .map(|unwrapper| unwrapper.engine)
}

/// Resolves a result link to its true destination.
///
/// - links on a known engine host are unwrapped with that engine's extractor;
///   engine-internal links that are not redirect wrappers yield `None`
/// - any other http(s) link is returned unchanged
///
/// # Examples
///
/// ```
/// use pdf_harvest::discovery::unwrap_redirect;
///
/// let wrapped = "https://duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.gov%2Fa.pdf&rut=x";
/// assert_eq!(unwrap_redirect(wrapped).as_deref(), Some("https://example.gov/a.pdf"));
/// assert_eq!(unwrap_redirect("https://example.gov/b.pdf").as_deref(), Some("https://example.gov/b.pdf"));
/// ```
#[must_use]
pub fn unwrap_redirect(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    match UNWRAPPERS
        .iter()
        .find(|unwrapper| (unwrapper.matches_host)(host))
    {
        Some(unwrapper) => (unwrapper.extract)(&parsed),
        None => absolute_http(url),
    }
}
