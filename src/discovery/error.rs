//! Error types for discovery engines.

use thiserror::Error;

use crate::fetch::FetchError;

/// Errors that end one engine's discovery for one query.
///
/// The registry logs these and carries on with the remaining engines.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The underlying request failed.
    #[error("{engine}: {source}")]
    Fetch {
        engine: String,
        #[source]
        source: FetchError,
    },

    /// The endpoint answered with a non-success status.
    #[error("{engine}: HTTP {status} from {url}")]
    Status {
        engine: String,
        url: String,
        status: u16,
    },

    /// A seed page did not declare an HTML content type.
    #[error("{engine}: {url} is not HTML (content-type: {content_type})")]
    NotHtml {
        engine: String,
        url: String,
        content_type: String,
    },

    /// A structured response could not be decoded.
    #[error("{engine}: malformed response from {url}: {message}")]
    Malformed {
        engine: String,
        url: String,
        message: String,
    },
}

impl DiscoveryError {
    pub fn fetch(engine: impl Into<String>, source: FetchError) -> Self {
        Self::Fetch {
            engine: engine.into(),
            source,
        }
    }

    pub fn status(engine: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            engine: engine.into(),
            url: url.into(),
            status,
        }
    }

    pub fn not_html(
        engine: impl Into<String>,
        url: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::NotHtml {
            engine: engine.into(),
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    pub fn malformed(
        engine: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Malformed {
            engine: engine.into(),
            url: url.into(),
            message: message.into(),
        }
    }
}
