//! robots.txt fetching, parsing, and fail-closed per-origin caching.
//!
//! Entries are computed on first access to an origin and never expire within a
//! run. Anything short of a readable robots.txt (or a definitive 404/410) is
//! cached as [`RobotsEntry::Denied`], so an unreachable or erroring origin is
//! never crawled.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, instrument, warn};

use super::client::FetchClient;

/// robots.txt bodies beyond this size are truncated before parsing.
const MAX_ROBOTS_BYTES: u64 = 512 * 1024;

/// Cached decision source for one origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsEntry {
    /// robots.txt was read (or is absent); evaluate these rules per path.
    Allowed(RobotsRules),
    /// robots.txt could not be determined; every URL under the origin is refused.
    Denied,
}

impl RobotsEntry {
    /// Evaluates the entry for a path (with optional query).
    #[must_use]
    pub fn permits(&self, path: &str) -> bool {
        match self {
            Self::Allowed(rules) => rules.is_allowed(path),
            Self::Denied => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    pattern: String,
}

/// Allow/Disallow rules that apply to one user-agent token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    rules: Vec<Rule>,
}

impl RobotsRules {
    /// Rules that allow every path (no robots.txt).
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses a robots.txt body for the given user-agent token.
    ///
    /// Groups naming the token take precedence; otherwise `User-agent: *`
    /// groups apply. Consecutive `User-agent` lines share one group.
    #[must_use]
    pub fn parse(body: &str, agent: &str) -> Self {
        let agent = agent.to_ascii_lowercase();
        let mut specific = Vec::new();
        let mut wildcard = Vec::new();

        let mut group_agents: Vec<String> = Vec::new();
        let mut group_has_rules = false;

        for raw_line in body.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if group_has_rules {
                        group_agents.clear();
                        group_has_rules = false;
                    }
                    group_agents.push(value.to_ascii_lowercase());
                }
                "allow" | "disallow" => {
                    group_has_rules = true;
                    if value.is_empty() {
                        continue;
                    }
                    let rule = Rule {
                        allow: key == "allow",
                        pattern: normalize_rule_path(value),
                    };
                    if group_agents
                        .iter()
                        .any(|name| name != "*" && agent_matches(&agent, name))
                    {
                        specific.push(rule.clone());
                    }
                    if group_agents.iter().any(|name| name == "*") {
                        wildcard.push(rule);
                    }
                }
                _ => {}
            }
        }

        let rules = if specific.is_empty() {
            wildcard
        } else {
            specific
        };
        Self { rules }
    }

    /// Returns true if the path may be fetched.
    ///
    /// The longest matching pattern wins; on equal length `Allow` wins.
    #[must_use]
    pub fn is_allowed(&self, path: &str) -> bool {
        let mut best: Option<(usize, bool)> = None;
        for rule in &self.rules {
            if !pattern_matches(&rule.pattern, path) {
                continue;
            }
            let specificity = rule.pattern.len();
            best = match best {
                Some((len, allow))
                    if len > specificity || (len == specificity && allow && !rule.allow) =>
                {
                    Some((len, allow))
                }
                _ => Some((specificity, rule.allow)),
            };
        }
        best.is_none_or(|(_, allow)| allow)
    }

    /// Returns true if no rules apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn agent_matches(agent: &str, group_name: &str) -> bool {
    !group_name.is_empty() && agent.starts_with(group_name)
}

fn normalize_rule_path(path: &str) -> String {
    if path.starts_with('/') || path.starts_with('*') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Matches a robots pattern (`*` wildcard, `$` end anchor) against a path.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored_end) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    if !path.starts_with(first) {
        return false;
    }
    let mut pos = first.len();
    let rest: Vec<&str> = parts.collect();

    if rest.is_empty() {
        return !anchored_end || pos == path.len();
    }

    for (index, part) in rest.iter().enumerate() {
        if anchored_end && index == rest.len() - 1 {
            return path.len() >= pos + part.len() && path[pos..].ends_with(part);
        }
        match path[pos..].find(part) {
            Some(offset) => pos += offset + part.len(),
            None => return false,
        }
    }
    true
}

/// Fail-closed robots.txt gate with a per-origin cache.
#[derive(Debug)]
pub struct RobotsGate {
    agent: String,
    cache: DashMap<String, Arc<RobotsEntry>>,
}

impl RobotsGate {
    /// Creates a gate that evaluates rules for the given user-agent token.
    #[must_use]
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            cache: DashMap::new(),
        }
    }

    /// Returns the cached entry for an origin, if one was computed.
    #[must_use]
    pub fn cached(&self, origin: &str) -> Option<Arc<RobotsEntry>> {
        self.cache.get(origin).map(|entry| Arc::clone(entry.value()))
    }

    /// Decides whether `url` may be fetched.
    ///
    /// Malformed URLs are refused. The first call for an origin fetches its
    /// robots.txt through `client` (rate limited like any other request).
    #[instrument(skip(self, client), fields(origin))]
    pub async fn can_fetch(&self, url: &str, client: &FetchClient) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        let Some(origin) = origin_for_robots(url) else {
            return false;
        };
        tracing::Span::current().record("origin", origin.as_str());

        let entry = match self.cached(&origin) {
            Some(entry) => entry,
            None => {
                let computed = Arc::new(self.load(&origin, client).await);
                self.cache
                    .entry(origin.clone())
                    .or_insert(computed)
                    .value()
                    .clone()
            }
        };

        let path = match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        };
        let allowed = entry.permits(&path);
        if !allowed {
            debug!(path = %path, origin = %origin, "robots gate refuses path");
        }
        allowed
    }

    async fn load(&self, origin: &str, client: &FetchClient) -> RobotsEntry {
        let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));
        match client.get_robots_txt(&robots_url, MAX_ROBOTS_BYTES).await {
            Ok((status, body)) if (200..300).contains(&status) => {
                let Some(text) = decode_robots_body(body) else {
                    warn!(origin = %origin, "robots.txt is not valid UTF-8 - denying origin for this run");
                    return RobotsEntry::Denied;
                };
                let rules = RobotsRules::parse(&text, &self.agent);
                info!(origin = %origin, rules = rules.rules.len(), "loaded robots.txt");
                RobotsEntry::Allowed(rules)
            }
            Ok((404 | 410, _)) => {
                debug!(origin = %origin, "no robots.txt - all paths allowed");
                RobotsEntry::Allowed(RobotsRules::allow_all())
            }
            Ok((status, _)) => {
                warn!(origin = %origin, status, "robots.txt unavailable - denying origin for this run");
                RobotsEntry::Denied
            }
            Err(error) => {
                warn!(origin = %origin, error = %error, "robots.txt fetch failed - denying origin for this run");
                RobotsEntry::Denied
            }
        }
    }
}

/// Decodes a robots.txt body as UTF-8, dropping a leading byte-order mark.
///
/// A multi-byte sequence cut off at the end (the body is capped) is dropped;
/// any other invalid byte makes the body undecodable.
fn decode_robots_body(body: Vec<u8>) -> Option<String> {
    let text = match String::from_utf8(body) {
        Ok(text) => text,
        Err(error) if error.utf8_error().error_len().is_none() => {
            let valid = error.utf8_error().valid_up_to();
            let mut bytes = error.into_bytes();
            bytes.truncate(valid);
            String::from_utf8(bytes).ok()?
        }
        Err(_) => return None,
    };
    Some(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Builds the origin string (scheme + host + explicit port) for robots lookup.
#[must_use]
pub fn origin_for_robots(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let scheme = parsed.scheme();
    let host = parsed.host_str()?;
    let origin = match parsed.port() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    };
    Some(origin)
}
