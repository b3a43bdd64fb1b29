//! Unexpected per-URL failures.
//!
//! Policy outcomes (robots, size, license) are not errors; they become
//! [`super::UrlOutcome`] values directly.

use thiserror::Error;

use crate::storage::StorageError;

/// A URL-local failure that is recorded as `error` in the manifest.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The accepted document could not be stored.
    #[error("failed to store {url}: {source}")]
    Storage {
        url: String,
        #[source]
        source: StorageError,
    },
}

impl PipelineError {
    pub fn storage(url: impl Into<String>, source: StorageError) -> Self {
        Self::Storage {
            url: url.into(),
            source,
        }
    }
}
