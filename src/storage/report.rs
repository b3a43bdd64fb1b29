//! End-of-run JSON summary of saved files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::SavedArtifact;
use super::error::StorageError;

/// File name of the report inside the output directory.
pub const REPORT_FILENAME: &str = "download_report.json";

/// One saved file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub filename: String,
    pub url: String,
    pub category: String,
    pub search_term: Option<String>,
    pub size: u64,
    pub sha256: String,
    pub timestamp: DateTime<Utc>,
}

/// Accumulates saved files over a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    total_files: usize,
    categories: BTreeMap<String, usize>,
    files: Vec<ReportEntry>,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    generated_at: DateTime<Utc>,
}

impl RunReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a saved file. A file already reported at the same path is not
    /// counted twice.
    pub fn add(&mut self, url: &str, category: &str, search_term: Option<&str>, saved: &SavedArtifact) {
        let filename = saved.filename();
        if self
            .files
            .iter()
            .any(|entry| entry.filename == filename && entry.category == category)
        {
            return;
        }
        self.total_files += 1;
        *self.categories.entry(category.to_string()).or_default() += 1;
        self.files.push(ReportEntry {
            filename,
            url: url.to_string(),
            category: category.to_string(),
            search_term: search_term.map(str::to_string),
            size: saved.size,
            sha256: saved.sha256.clone(),
            timestamp: Utc::now(),
        });
    }

    #[must_use]
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Saved-file counts per category, sorted by category.
    #[must_use]
    pub fn category_counts(&self) -> &BTreeMap<String, usize> {
        &self.categories
    }

    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.files
    }

    /// Writes `download_report.json` into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if serialization or the write fails.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf, StorageError> {
        std::fs::create_dir_all(output_dir).map_err(|e| StorageError::io(output_dir, e))?;
        let path = output_dir.join(REPORT_FILENAME);
        let document = ReportDocument {
            report: self,
            generated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(&path, json).map_err(|e| StorageError::io(&path, e))?;
        info!(path = %path.display(), total = self.total_files, "wrote run report");
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact(name: &str) -> SavedArtifact {
        SavedArtifact {
            path: PathBuf::from("out/networking").join(name),
            sha256: "ab".repeat(32),
            size: 42,
            already_present: false,
        }
    }

    #[test]
    fn test_add_counts_per_category_once() {
        let mut report = RunReport::new();
        report.add("https://a.gov/1.pdf", "networking", Some("switch"), &artifact("a__1.pdf"));
        report.add("https://a.gov/1.pdf", "networking", Some("switch"), &artifact("a__1.pdf"));
        report.add("https://b.gov/2.pdf", "seeds", None, &artifact("b__2.pdf"));

        assert_eq!(report.total_files(), 2);
        assert_eq!(report.category_counts().get("networking"), Some(&1));
        assert_eq!(report.category_counts().get("seeds"), Some(&1));
    }

    #[test]
    fn test_write_report_json() {
        let dir = TempDir::new().unwrap();
        let mut report = RunReport::new();
        report.add("https://a.gov/1.pdf", "networking", Some("switch"), &artifact("a__1.pdf"));

        let path = report.write(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(REPORT_FILENAME));

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_files"], 1);
        assert_eq!(value["categories"]["networking"], 1);
        assert_eq!(value["files"][0]["filename"], "a__1.pdf");
        assert_eq!(value["files"][0]["search_term"], "switch");
        assert_eq!(value["files"][0]["size"], 42);
        assert!(value["generated_at"].is_string());
    }
}
