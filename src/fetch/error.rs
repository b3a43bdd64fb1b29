//! Error types for the fetch module.
//!
//! Every variant is URL-local: callers record it against the URL and move on.

use thiserror::Error;

/// Errors that can occur while fetching a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The origin's robots rules (or a fail-closed robots entry) forbid the URL.
    #[error("robots.txt disallows {url}")]
    RobotsDisallowed {
        /// The URL that was refused.
        url: String,
    },

    /// The URL could not be parsed or has no host.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The request did not complete within its timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Network-level failure (DNS, connect, TLS).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A redirect chain went past the hop limit.
    #[error("too many redirects fetching {url} (limit {limit})")]
    TooManyRedirects {
        /// The URL the chain started from.
        url: String,
        /// The hop limit.
        limit: usize,
    },

    /// The body exceeded the configured byte cap and the stream was aborted.
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge {
        /// The URL whose body was too large.
        url: String,
        /// The cap that was exceeded.
        limit: u64,
    },

    /// The body stream failed after the response head arrived.
    #[error("error reading body of {url}: {source}")]
    Body {
        /// The URL whose body failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Creates a robots-disallow error.
    pub fn robots_disallowed(url: impl Into<String>) -> Self {
        Self::RobotsDisallowed { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a network error, promoting reqwest timeouts to [`FetchError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a redirect-limit error.
    pub fn too_many_redirects(url: impl Into<String>, limit: usize) -> Self {
        Self::TooManyRedirects {
            url: url.into(),
            limit,
        }
    }

    /// Creates a too-large error.
    pub fn too_large(url: impl Into<String>, limit: u64) -> Self {
        Self::TooLarge {
            url: url.into(),
            limit,
        }
    }

    /// Creates a body read error, promoting reqwest timeouts to [`FetchError::Timeout`].
    pub fn body(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Short machine-readable code used in manifest reasons.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RobotsDisallowed { .. } => "robots_disallow",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Timeout { .. } => "timeout",
            Self::Network { .. } => "network_error",
            Self::TooManyRedirects { .. } => "too_many_redirects",
            Self::TooLarge { .. } => "file_too_large",
            Self::Body { .. } => "body_error",
        }
    }
}
