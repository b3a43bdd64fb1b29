//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use pdf_harvest::config::ConfigOverrides;

/// Discover, vet, and archive openly licensed PDF documents.
///
/// Runs every search term and seed page from the catalog through discovery,
/// robots and rate gating, PDF verification, and the license heuristic, then
/// stores accepted files and records every decision in the manifest.
#[derive(Parser, Debug)]
#[command(name = "pdf-harvest")]
#[command(author, version, about)]
pub struct Args {
    /// Catalog file (default: $XDG_CONFIG_HOME/pdf-harvest/catalog.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for saved PDFs and the run report
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Manifest CSV path (default: <output-dir>/manifest.csv)
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Global request budget per minute (1-600)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=600))]
    pub rpm: Option<u32>,

    /// Minimum seconds between requests to the same domain (0-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub domain_delay: Option<u64>,

    /// Maximum document size in megabytes (1-2048)
    #[arg(long, value_name = "MB", value_parser = clap::value_parser!(u64).range(1..=2048))]
    pub max_file_mb: Option<u64>,

    /// Maximum new candidates per search term or seed (1-1000)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..=1000))]
    pub max_results: Option<u16>,

    /// Disable search-engine result scraping (API search and seeds still run)
    #[arg(long)]
    pub no_search: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Command-line values that override the catalog.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            output_dir: self.output_dir.clone(),
            manifest: self.manifest.clone(),
            requests_per_minute: self.rpm,
            domain_delay_secs: self.domain_delay,
            max_file_mb: self.max_file_mb,
            max_results_per_term: self.max_results.map(usize::from),
        }
    }

    /// Default log level: `-q` → error, none → info, `-v` → debug, `-vv` → trace.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
