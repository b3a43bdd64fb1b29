//! User-Agent identity and browser-plausible request headers.
//!
//! robots.txt is fetched under the crawler's own identity and its rules are
//! matched against [`DEFAULT_ROBOTS_AGENT`] (or the configured token). Page and
//! document requests rotate through a small pool of browser headers because
//! many document hosts serve bot-looking clients an HTML interstitial.

use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/pdf-harvest";

/// Product token matched against `User-agent:` groups in robots.txt.
pub const DEFAULT_ROBOTS_AGENT: &str = "pdf-harvest";

const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

const ACCEPT_LANGUAGES: &[&str] = &["en-US,en;q=0.9", "en-GB,en;q=0.8", "en;q=0.9"];

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/pdf;q=0.9,application/xml;q=0.8,*/*;q=0.7";

/// User-Agent sent with robots.txt requests (identifies the tool).
#[must_use]
pub fn identity_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{DEFAULT_ROBOTS_AGENT}/{version} (document-archiver; +{PROJECT_UA_URL})")
}

/// Builds a randomized but browser-plausible header set for one request.
#[must_use]
pub fn browser_headers() -> HeaderMap {
    let mut rng = rand::thread_rng();
    let user_agent = BROWSER_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(BROWSER_USER_AGENTS[0]);
    let language = ACCEPT_LANGUAGES
        .choose(&mut rng)
        .copied()
        .unwrap_or(ACCEPT_LANGUAGES[0]);

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(language));
    headers
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_user_agent_names_tool_and_version() {
        let ua = identity_user_agent();
        assert!(ua.starts_with("pdf-harvest/"));
        assert!(ua.contains(env!("CARGO_PKG_VERSION")));
        assert!(ua.contains(PROJECT_UA_URL));
    }

    #[test]
    fn test_browser_headers_come_from_pool() {
        for _ in 0..20 {
            let headers = browser_headers();
            let ua = headers.get(USER_AGENT).unwrap().to_str().unwrap();
            assert!(BROWSER_USER_AGENTS.contains(&ua));
            assert!(headers.contains_key(ACCEPT_LANGUAGE));
            assert!(
                headers
                    .get(ACCEPT)
                    .unwrap()
                    .to_str()
                    .unwrap()
                    .contains("application/pdf")
            );
        }
    }
}
