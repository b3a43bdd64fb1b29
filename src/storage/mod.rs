//! Content-addressed storage of accepted PDFs plus the run's audit trail.
//!
//! Files are named `<sha256 prefix>__<slug>.pdf` under a per-category
//! directory. Saving the same bytes twice lands on the same name and is a
//! no-op; a different file under that name is refused, never overwritten.

mod error;
pub mod manifest;
pub mod report;

pub use error::{ManifestError, StorageError};
pub use manifest::{MANIFEST_HEADER, Manifest, ManifestRecord, ManifestStatus};
pub use report::{REPORT_FILENAME, ReportEntry, RunReport};

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use url::Url;

/// Hex characters of the checksum used in filenames.
pub const CHECKSUM_PREFIX_LEN: usize = 12;

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 80;

const FALLBACK_SLUG: &str = "document";
const FALLBACK_CATEGORY: &str = "uncategorized";
const PARTIAL_SUFFIX: &str = ".part";

/// Lowercase hex SHA-256 of `content`.
#[must_use]
pub fn content_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Replaces every run of characters outside `[A-Za-z0-9-_]` with one `_`
/// and caps the result at `max_len` characters.
#[must_use]
pub fn sanitize_slug(value: &str, max_len: usize) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
            prev_sep = false;
        } else if !prev_sep {
            out.push('_');
            prev_sep = true;
        }
    }
    let trimmed: String = out.trim_matches('_').chars().take(max_len).collect();
    trimmed.trim_end_matches('_').to_string()
}

/// Slug from the URL's decoded path basename, without its `.pdf` extension.
///
/// Falls back to the sanitized `fallback` (usually the search term), then to
/// `document`.
#[must_use]
pub fn slug_for_url(url: &str, fallback: Option<&str>) -> String {
    let from_path = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|segment| {
            let decoded = urlencoding::decode(&segment)
                .map(std::borrow::Cow::into_owned)
                .unwrap_or(segment);
            strip_pdf_extension(&decoded).to_string()
        })
        .map(|stem| sanitize_slug(&stem, MAX_SLUG_LEN))
        .filter(|slug| !slug.is_empty());

    from_path
        .or_else(|| {
            fallback
                .map(|term| sanitize_slug(term, MAX_SLUG_LEN))
                .filter(|slug| !slug.is_empty())
        })
        .unwrap_or_else(|| FALLBACK_SLUG.to_string())
}

fn strip_pdf_extension(name: &str) -> &str {
    let len = name.len();
    if len >= 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".pdf") {
        &name[..len - 4]
    } else {
        name
    }
}

/// `<checksum prefix>__<slug>.pdf`.
#[must_use]
pub fn artifact_filename(sha256: &str, slug: &str) -> String {
    let prefix: String = sha256.chars().take(CHECKSUM_PREFIX_LEN).collect();
    format!("{prefix}__{slug}.pdf")
}

/// Directory name for a category.
#[must_use]
pub fn category_dir_name(category: &str) -> String {
    let name = sanitize_slug(&category.to_lowercase(), MAX_SLUG_LEN);
    if name.is_empty() {
        FALLBACK_CATEGORY.to_string()
    } else {
        name
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    /// Full path of the stored file.
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the content.
    pub sha256: String,
    /// Size in bytes.
    pub size: u64,
    /// True if the identical file was already present.
    pub already_present: bool,
}

impl SavedArtifact {
    /// The file name component of [`SavedArtifact::path`].
    #[must_use]
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Content-addressed writer rooted at the output directory.
#[derive(Debug, Clone)]
pub struct Storage {
    output_dir: PathBuf,
}

impl Storage {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the content would be saved at, without touching the filesystem.
    #[must_use]
    pub fn target_path(
        &self,
        url: &str,
        sha256: &str,
        category: &str,
        fallback_term: Option<&str>,
    ) -> PathBuf {
        self.output_dir
            .join(category_dir_name(category))
            .join(artifact_filename(sha256, &slug_for_url(url, fallback_term)))
    }

    /// Writes `content` under its content-derived name.
    ///
    /// The bytes go to a `.part` file first and are renamed into place, so a
    /// failed write never leaves a file under the final name.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Collision`] if a file with different content already
    ///   has the name
    /// - [`StorageError::Io`] on any filesystem failure
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn save(
        &self,
        url: &str,
        content: &[u8],
        category: &str,
        fallback_term: Option<&str>,
    ) -> Result<SavedArtifact, StorageError> {
        let sha256 = content_sha256(content);
        let path = self.target_path(url, &sha256, category, fallback_term);
        let size = content.len() as u64;

        match tokio::fs::read(&path).await {
            Ok(existing) => {
                if content_sha256(&existing) == sha256 {
                    debug!(path = %path.display(), "identical content already stored");
                    return Ok(SavedArtifact {
                        path,
                        sha256,
                        size,
                        already_present: true,
                    });
                }
                return Err(StorageError::collision(path));
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(StorageError::io(path, error)),
        }

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::io(dir, e))?;
        }

        let partial = partial_path(&path);
        if let Err(error) = tokio::fs::write(&partial, content).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(StorageError::io(partial, error));
        }
        if let Err(error) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(StorageError::io(path, error));
        }

        debug!(path = %path.display(), "stored");
        Ok(SavedArtifact {
            path,
            sha256,
            size,
            already_present: false,
        })
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_slug_collapses_and_caps() {
        assert_eq!(sanitize_slug("Cisco  Switch (v2).final", 80), "Cisco_Switch_v2_final");
        assert_eq!(sanitize_slug("__a__", 80), "a");
        assert_eq!(sanitize_slug(&"x".repeat(200), 80).len(), 80);
        assert_eq!(sanitize_slug("ab cd", 3), "ab");
    }

    #[test]
    fn test_slug_for_url_decodes_basename() {
        assert_eq!(
            slug_for_url("https://example.gov/docs/Switch%20Guide.PDF?x=1", None),
            "Switch_Guide"
        );
        assert_eq!(slug_for_url("https://example.gov/r/manual.pdf", Some("t")), "manual");
    }

    #[test]
    fn test_slug_for_url_fallbacks() {
        assert_eq!(
            slug_for_url("https://example.gov/", Some("router config guide")),
            "router_config_guide"
        );
        assert_eq!(slug_for_url("https://example.gov/", None), "document");
        assert_eq!(slug_for_url("https://example.gov/%%%", Some("!!!")), "document");
    }

    #[test]
    fn test_artifact_filename_shape() {
        let sha = content_sha256(b"%PDF-1.4");
        let name = artifact_filename(&sha, "manual");
        assert_eq!(name, format!("{}__manual.pdf", &sha[..12]));
    }

    #[test]
    fn test_category_dir_name() {
        assert_eq!(category_dir_name("Networking Gear"), "networking_gear");
        assert_eq!(category_dir_name("///"), "uncategorized");
    }

    #[tokio::test]
    async fn test_save_writes_under_category() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let saved = storage
            .save("https://example.gov/a/guide.pdf", b"%PDF-1.7 body", "Networking", None)
            .await
            .unwrap();

        assert!(saved.path.starts_with(dir.path().join("networking")));
        assert!(saved.filename().ends_with("__guide.pdf"));
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"%PDF-1.7 body");
        assert!(!saved.already_present);
        assert!(!partial_path(&saved.path).exists());
    }

    #[tokio::test]
    async fn test_save_identical_content_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let first = storage
            .save("https://a.gov/x.pdf", b"%PDF same", "c", None)
            .await
            .unwrap();
        let second = storage
            .save("https://a.gov/x.pdf", b"%PDF same", "c", None)
            .await
            .unwrap();
        assert_eq!(first.path, second.path);
        assert_eq!(first.sha256, second.sha256);
        assert!(second.already_present);
    }

    #[tokio::test]
    async fn test_same_content_different_urls_share_checksum_prefix() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let a = storage.save("https://a.gov/one.pdf", b"%PDF x", "c", None).await.unwrap();
        let b = storage.save("https://b.gov/two.pdf", b"%PDF x", "c", None).await.unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.filename()[..12], b.filename()[..12]);
    }

    #[tokio::test]
    async fn test_save_refuses_to_overwrite_different_content() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let sha = content_sha256(b"%PDF new");
        let path = storage.target_path("https://a.gov/x.pdf", &sha, "c", None);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"something else").unwrap();

        let result = storage.save("https://a.gov/x.pdf", b"%PDF new", "c", None).await;
        assert!(matches!(result, Err(StorageError::Collision { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), b"something else");
    }
}
