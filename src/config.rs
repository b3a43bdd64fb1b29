//! Run configuration: the TOML catalog plus command-line overrides.
//!
//! Precedence is CLI value, then catalog value, then built-in default. The
//! catalog also carries the static inputs of a run: search terms grouped by
//! category, seed pages, and the optional domain allowlist.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::fetch::constants::{DEFAULT_DOMAIN_DELAY, DEFAULT_REQUESTS_PER_MINUTE};
use crate::license::DEFAULT_PREVIEW_PAGES;
use crate::pipeline::DEFAULT_MAX_RESULTS_PER_QUERY;
use crate::user_agent::DEFAULT_ROBOTS_AGENT;

/// Output directory used when neither the catalog nor the CLI names one.
pub const DEFAULT_OUTPUT_DIR: &str = "library";
/// Manifest file name inside the output directory.
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.csv";
/// Default body cap in megabytes.
pub const DEFAULT_MAX_FILE_MB: u64 = 40;
/// Default pause between consecutive search terms.
pub const DEFAULT_TERM_DELAY: Duration = Duration::from_secs(3);
/// Category assigned to seeds that do not name one.
pub const DEFAULT_SEED_CATEGORY: &str = "seeds";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The catalog file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not valid TOML for this schema.
    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its accepted range.
    #[error("invalid value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A seed is not an absolute http(s) URL.
    #[error("invalid seed URL: {url}")]
    InvalidSeed { url: String },

    /// No search terms and no seeds: nothing could ever be discovered.
    #[error("catalog has no search terms and no seed URLs - nothing to do")]
    NothingToDo,
}

impl ConfigError {
    fn out_of_range(field: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

/// A seed page from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedEntry {
    pub url: String,
    #[serde(default = "default_seed_category")]
    pub category: String,
}

fn default_seed_category() -> String {
    DEFAULT_SEED_CATEGORY.to_string()
}

/// The catalog file as written on disk. Every setting is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    pub output_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub requests_per_minute: Option<u32>,
    pub domain_delay_secs: Option<u64>,
    pub max_file_mb: Option<u64>,
    pub max_results_per_term: Option<usize>,
    pub preview_pages: Option<usize>,
    pub term_delay_secs: Option<u64>,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    pub robots_agent: Option<String>,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub seeds: Vec<SeedEntry>,
}

impl CatalogFile {
    /// Parses catalog TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] (attributed to `path`) on invalid TOML
    /// or unknown keys.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads and parses a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub requests_per_minute: Option<u32>,
    pub domain_delay_secs: Option<u64>,
    pub max_file_mb: Option<u64>,
    pub max_results_per_term: Option<usize>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub requests_per_minute: u32,
    pub domain_delay: Duration,
    pub max_file_mb: u64,
    pub max_results_per_term: usize,
    pub preview_pages: usize,
    pub term_delay: Duration,
    pub allowed_domains: Vec<String>,
    pub robots_agent: String,
    /// Search terms by category, iterated in category name order.
    pub categories: BTreeMap<String, Vec<String>>,
    pub seeds: Vec<SeedEntry>,
}

impl HarvestConfig {
    /// Layers `overrides` over `file` over the defaults.
    #[must_use]
    pub fn resolve(file: CatalogFile, overrides: &ConfigOverrides) -> Self {
        let output_dir = overrides
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let manifest_path = overrides
            .manifest
            .clone()
            .or(file.manifest)
            .unwrap_or_else(|| output_dir.join(DEFAULT_MANIFEST_NAME));

        let categories = file
            .categories
            .into_iter()
            .map(|(category, terms)| {
                let terms: Vec<String> = terms
                    .into_iter()
                    .map(|term| term.trim().to_string())
                    .filter(|term| !term.is_empty())
                    .collect();
                (category, terms)
            })
            .filter(|(_, terms)| !terms.is_empty())
            .collect();

        Self {
            output_dir,
            manifest_path,
            requests_per_minute: overrides
                .requests_per_minute
                .or(file.requests_per_minute)
                .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE),
            domain_delay: overrides
                .domain_delay_secs
                .or(file.domain_delay_secs)
                .map_or(DEFAULT_DOMAIN_DELAY, Duration::from_secs),
            max_file_mb: overrides
                .max_file_mb
                .or(file.max_file_mb)
                .unwrap_or(DEFAULT_MAX_FILE_MB),
            max_results_per_term: overrides
                .max_results_per_term
                .or(file.max_results_per_term)
                .unwrap_or(DEFAULT_MAX_RESULTS_PER_QUERY),
            preview_pages: file.preview_pages.unwrap_or(DEFAULT_PREVIEW_PAGES),
            term_delay: file
                .term_delay_secs
                .map_or(DEFAULT_TERM_DELAY, Duration::from_secs),
            allowed_domains: file
                .allowed_domains
                .into_iter()
                .map(|domain| domain.trim().to_string())
                .filter(|domain| !domain.is_empty())
                .collect(),
            robots_agent: file
                .robots_agent
                .map(|agent| agent.trim().to_string())
                .filter(|agent| !agent.is_empty())
                .unwrap_or_else(|| DEFAULT_ROBOTS_AGENT.to_string()),
            categories,
            seeds: file.seeds,
        }
    }

    /// Loads the catalog at `path`, applies overrides, and validates.
    ///
    /// # Errors
    ///
    /// Returns any [`ConfigError`]; [`ConfigError::NothingToDo`] when the
    /// catalog lists neither terms nor seeds.
    pub fn load(path: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let config = Self::resolve(CatalogFile::load(path)?, overrides);
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges, seed URLs, and that there is something to discover.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=600).contains(&self.requests_per_minute) {
            return Err(ConfigError::out_of_range(
                "requests_per_minute",
                self.requests_per_minute,
                "1..=600",
            ));
        }
        if self.domain_delay > Duration::from_secs(3600) {
            return Err(ConfigError::out_of_range(
                "domain_delay_secs",
                self.domain_delay.as_secs(),
                "0..=3600",
            ));
        }
        if !(1..=2048).contains(&self.max_file_mb) {
            return Err(ConfigError::out_of_range("max_file_mb", self.max_file_mb, "1..=2048"));
        }
        if !(1..=1000).contains(&self.max_results_per_term) {
            return Err(ConfigError::out_of_range(
                "max_results_per_term",
                self.max_results_per_term,
                "1..=1000",
            ));
        }
        if !(1..=50).contains(&self.preview_pages) {
            return Err(ConfigError::out_of_range("preview_pages", self.preview_pages, "1..=50"));
        }
        if self.term_delay > Duration::from_secs(3600) {
            return Err(ConfigError::out_of_range(
                "term_delay_secs",
                self.term_delay.as_secs(),
                "0..=3600",
            ));
        }

        for seed in &self.seeds {
            let valid = Url::parse(&seed.url)
                .ok()
                .is_some_and(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some());
            if !valid {
                return Err(ConfigError::InvalidSeed {
                    url: seed.url.clone(),
                });
            }
        }

        if self.term_count() == 0 && self.seeds.is_empty() {
            return Err(ConfigError::NothingToDo);
        }
        Ok(())
    }

    /// Total number of search terms across categories.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Body cap in bytes.
    #[must_use]
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// Resolves the default catalog path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/pdf-harvest/catalog.toml`
/// 2. `$HOME/.config/pdf-harvest/catalog.toml`
#[must_use]
pub fn resolve_default_catalog_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("pdf-harvest")
                .join("catalog.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("pdf-harvest")
            .join("catalog.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}
