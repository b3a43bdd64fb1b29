//! Error types for storage, manifest, and report writing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while persisting an accepted document or the run report.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure at `path`.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path being written or read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A different file already occupies the content-derived name.
    #[error("refusing to overwrite {path}: existing file has different content")]
    Collision {
        /// The occupied path.
        path: PathBuf,
    },

    /// The run report could not be serialized.
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a collision error for `path`.
    pub fn collision(path: impl Into<PathBuf>) -> Self {
        Self::Collision { path: path.into() }
    }
}

/// Errors from the append-only manifest.
///
/// These are the only errors that stop a run: without the manifest there is
/// no audit trail.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest could not be created, opened, or appended to.
    #[error("manifest I/O error at {path}: {source}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Creates an I/O error for the manifest at `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let error = StorageError::collision("/tmp/abc__doc.pdf");
        assert!(error.to_string().contains("/tmp/abc__doc.pdf"));

        let error = StorageError::io(
            "/tmp/x.pdf",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = error.to_string();
        assert!(msg.contains("/tmp/x.pdf"), "Expected path in: {msg}");
        assert!(msg.contains("denied"), "Expected cause in: {msg}");
    }

    #[test]
    fn test_manifest_error_display() {
        let error = ManifestError::io(
            "manifest.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(error.to_string().contains("manifest.csv"));
    }
}
