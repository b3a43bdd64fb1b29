//! Shared helpers: static regex compilation, host normalization, link resolution.

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Normalizes a host string: trim, strip leading "www.", trailing '.', and lowercase.
#[must_use]
pub fn canonical_host(host: &str) -> String {
    host.trim()
        .to_ascii_lowercase()
        .trim_start_matches("www.")
        .trim_end_matches('.')
        .to_string()
}

/// Returns true if `host` equals `allowed` or is a subdomain of it.
#[must_use]
pub fn host_within(host: &str, allowed: &str) -> bool {
    let host = canonical_host(host);
    let allowed = canonical_host(allowed);
    !allowed.is_empty()
        && (host == allowed
            || host
                .strip_suffix(allowed.as_str())
                .is_some_and(|head| head.ends_with('.')))
}

/// Resolves a possibly relative link against the page it was found on.
///
/// Returns `None` for fragments, `javascript:`/`mailto:` links, and anything
/// that does not resolve to http(s).
#[must_use]
pub fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('#') {
        return None;
    }
    let resolved = base_url.join(value).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
