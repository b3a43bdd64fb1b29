//! Append-only CSV manifest: one row per processed URL.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use super::error::ManifestError;

/// Header row written when the manifest is first created.
pub const MANIFEST_HEADER: &str =
    "timestamp,source_url,status,reason,http_status,content_type,saved_path,sha256";

/// Terminal status of one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestStatus {
    Saved,
    Rejected,
    Skipped,
    Error,
}

impl ManifestStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    pub timestamp: DateTime<Utc>,
    pub source_url: String,
    pub status: ManifestStatus,
    pub reason: String,
    pub http_status: Option<u16>,
    pub content_type: Option<String>,
    pub saved_path: Option<PathBuf>,
    pub sha256: Option<String>,
}

impl ManifestRecord {
    /// A record stamped with the current time and no response details.
    #[must_use]
    pub fn new(source_url: impl Into<String>, status: ManifestStatus, reason: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source_url: source_url.into(),
            status,
            reason: reason.into(),
            http_status: None,
            content_type: None,
            saved_path: None,
            sha256: None,
        }
    }

    #[must_use]
    pub fn with_http_status(mut self, status: Option<u16>) -> Self {
        self.http_status = status;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    #[must_use]
    pub fn with_saved(mut self, path: PathBuf, sha256: String) -> Self {
        self.saved_path = Some(path);
        self.sha256 = Some(sha256);
        self
    }

    /// The row as one CSV line, without the trailing newline.
    #[must_use]
    pub fn to_csv_line(&self) -> String {
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        let http_status = self.http_status.map(|s| s.to_string()).unwrap_or_default();
        let saved_path = self
            .saved_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        [
            timestamp.as_str(),
            self.source_url.as_str(),
            self.status.as_str(),
            self.reason.as_str(),
            http_status.as_str(),
            self.content_type.as_deref().unwrap_or_default(),
            saved_path.as_str(),
            self.sha256.as_deref().unwrap_or_default(),
        ]
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",")
    }
}

/// Quotes a field when it holds a delimiter, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Append-only manifest file.
///
/// Each record is written with a single `write_all` under the lock, so rows
/// never interleave.
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    file: Mutex<File>,
}

impl Manifest {
    /// Opens `path` for appending, creating it (and its directory) with a
    /// header row if it does not exist or is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be created or opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| ManifestError::io(&path, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ManifestError::io(&path, e))?;
        let len = file
            .metadata()
            .map_err(|e| ManifestError::io(&path, e))?
            .len();
        if len == 0 {
            writeln!(file, "{MANIFEST_HEADER}").map_err(|e| ManifestError::io(&path, e))?;
            debug!(path = %path.display(), "created manifest");
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the write fails.
    pub fn record(&self, record: &ManifestRecord) -> Result<(), ManifestError> {
        let mut line = record.to_csv_line();
        line.push('\n');
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| ManifestError::io(&self.path, e))
    }
}
