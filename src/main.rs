//! CLI entry point for pdf-harvest.

use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_harvest::config::{HarvestConfig, resolve_default_catalog_path};
use pdf_harvest::discovery::{API_KEY_ENV, DiscoveryQuery, build_default_registry};
use pdf_harvest::fetch::{FetchClient, RateLimits, RobotsGate};
use pdf_harvest::license::LicenseHeuristic;
use pdf_harvest::pipeline::{Pipeline, PipelineSettings, RunStats};
use pdf_harvest::storage::{Manifest, Storage};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    debug!(?args, "CLI arguments parsed");

    let catalog_path = args
        .config
        .clone()
        .or_else(resolve_default_catalog_path)
        .context("no catalog given and no default config directory ($XDG_CONFIG_HOME or $HOME)")?;
    let config = HarvestConfig::load(&catalog_path, &args.overrides())
        .with_context(|| format!("invalid catalog {}", catalog_path.display()))?;
    info!(
        catalog = %catalog_path.display(),
        terms = config.term_count(),
        seeds = config.seeds.len(),
        output = %config.output_dir.display(),
        "pdf-harvest starting"
    );

    let mut pipeline = build_pipeline(&config, args.no_search)?;
    let spinner = progress_spinner(args.quiet);

    let mut run_stats = RunStats::default();
    let mut first_term = true;
    for (category, terms) in &config.categories {
        info!(category = %category, terms = terms.len(), "processing category");
        let mut success_count = 0_usize;
        for term in terms {
            if !first_term && !config.term_delay.is_zero() {
                debug!(delay_secs = config.term_delay.as_secs(), "pausing between terms");
                tokio::time::sleep(config.term_delay).await;
            }
            first_term = false;

            spinner.set_message(format!("[{category}] {term}"));
            let stats = pipeline
                .process_query(&DiscoveryQuery::term(term.as_str(), category.as_str()))
                .await
                .context("manifest write failed")?;
            if stats.saved > 0 {
                success_count += 1;
                info!(term = %term, %stats, "term produced documents");
            } else {
                info!(term = %term, %stats, "no documents saved for term");
            }
            run_stats.merge(&stats);
        }
        info!(
            category = %category,
            "category completed: {success_count}/{} successful",
            terms.len()
        );
    }

    for seed in &config.seeds {
        spinner.set_message(format!("[{}] {}", seed.category, seed.url));
        let stats = pipeline
            .process_query(&DiscoveryQuery::seed(seed.url.as_str(), seed.category.as_str()))
            .await
            .context("manifest write failed")?;
        info!(seed = %seed.url, %stats, "seed processed");
        run_stats.merge(&stats);
    }
    spinner.finish_and_clear();

    let report = pipeline.report();
    let report_path = report
        .write(&config.output_dir)
        .context("failed to write run report")?;
    for (category, count) in report.category_counts() {
        info!(category = %category, files = count, "saved per category");
    }
    info!(
        saved = run_stats.saved,
        rejected = run_stats.rejected,
        skipped = run_stats.skipped,
        errors = run_stats.errored,
        manifest = %config.manifest_path.display(),
        report = %report_path.display(),
        "run complete"
    );
    Ok(())
}

fn build_pipeline(config: &HarvestConfig, no_search: bool) -> Result<Pipeline> {
    let limits = Arc::new(RateLimits::new(config.requests_per_minute, config.domain_delay));
    let robots = Arc::new(RobotsGate::new(config.robots_agent.as_str()));
    let client = FetchClient::new(limits, robots).context("failed to build HTTP client")?;

    let registry = build_default_registry(!no_search, std::env::var(API_KEY_ENV).ok());
    debug!(?registry, "discovery engines");

    let manifest = Manifest::open(&config.manifest_path).with_context(|| {
        format!("failed to open manifest {}", config.manifest_path.display())
    })?;

    Ok(Pipeline::new(
        Arc::new(client),
        registry,
        LicenseHeuristic::with_pdf_extractor(config.preview_pages),
        Storage::new(config.output_dir.clone()),
        manifest,
        PipelineSettings {
            max_file_bytes: config.max_file_bytes(),
            max_results_per_query: config.max_results_per_term,
            allowed_domains: config.allowed_domains.clone(),
        },
    ))
}

/// Spinner on an interactive stderr, hidden otherwise.
fn progress_spinner(quiet: bool) -> ProgressBar {
    if quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
