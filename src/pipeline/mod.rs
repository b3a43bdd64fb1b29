//! Orchestrator: drives each candidate URL from discovery to a manifest row.
//!
//! Processing is sequential. One URL is fully decided before the next one
//! starts, so the rate limiters are never raced. Every URL that enters
//! [`Pipeline::process_candidate`] produces exactly one manifest record, and
//! nothing short of a manifest write failure stops the run.

mod error;
mod outcome;

pub use error::PipelineError;
pub use outcome::{RunStats, Stage, UrlOutcome};

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use tracing::{debug, error, info, instrument};

use crate::classify::{has_pdf_content_evidence, is_pdf_response};
use crate::discovery::{Candidate, DiscoveryQuery, DiscoveryRegistry};
use crate::fetch::constants::DEFAULT_MAX_CONTENT_BYTES;
use crate::fetch::{FetchClient, FetchError, FetchRequest, extract_domain};
use crate::license::{LicenseHeuristic, LicenseReason, forbids_indexing};
use crate::storage::{Manifest, ManifestError, ManifestRecord, RunReport, Storage};
use crate::util::host_within;

/// Default number of unseen candidates taken per term or seed.
pub const DEFAULT_MAX_RESULTS_PER_QUERY: usize = 10;

/// Limits applied to every candidate.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Hard cap on a document body.
    pub max_file_bytes: u64,
    /// Unseen candidates taken from one term or seed.
    pub max_results_per_query: usize,
    /// When non-empty, only these domains (and their subdomains) are fetched.
    pub allowed_domains: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_CONTENT_BYTES,
            max_results_per_query: DEFAULT_MAX_RESULTS_PER_QUERY,
            allowed_domains: Vec::new(),
        }
    }
}

/// Outcome plus the response details that go into the manifest.
struct Verdict {
    outcome: UrlOutcome,
    http_status: Option<u16>,
    content_type: Option<String>,
}

impl Verdict {
    fn new(outcome: UrlOutcome) -> Self {
        Self {
            outcome,
            http_status: None,
            content_type: None,
        }
    }

    fn with_response(mut self, status: u16, headers: &HeaderMap) -> Self {
        self.http_status = Some(status);
        self.content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self
    }
}

/// The discovery-and-acceptance pipeline for one run.
pub struct Pipeline {
    client: Arc<FetchClient>,
    registry: DiscoveryRegistry,
    license: LicenseHeuristic,
    storage: Storage,
    manifest: Manifest,
    settings: PipelineSettings,
    seen: HashSet<String>,
    stats: RunStats,
    report: RunReport,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("registry", &self.registry)
            .field("output_dir", &self.storage.output_dir())
            .field("manifest", &self.manifest.path())
            .field("settings", &self.settings)
            .field("seen", &self.seen.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(
        client: Arc<FetchClient>,
        registry: DiscoveryRegistry,
        license: LicenseHeuristic,
        storage: Storage,
        manifest: Manifest,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            client,
            registry,
            license,
            storage,
            manifest,
            settings,
            seen: HashSet::new(),
            stats: RunStats::default(),
            report: RunReport::new(),
        }
    }

    /// Counters over everything processed so far.
    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    #[must_use]
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Number of distinct URLs consumed this run.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Discovers candidates for one term or seed and processes the unseen ones.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if a record cannot be written.
    #[instrument(skip(self), fields(query = %query.label(), category = %query.category()))]
    pub async fn process_query(&mut self, query: &DiscoveryQuery) -> Result<RunStats, ManifestError> {
        let candidates = self.registry.discover_all(query, &self.client).await;
        let discovered = candidates.len();
        let fresh: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| !self.seen.contains(&candidate.url))
            .take(self.settings.max_results_per_query)
            .collect();
        info!(discovered, processing = fresh.len(), "candidates");

        let mut stats = RunStats::default();
        for candidate in &fresh {
            if let Some(outcome) = self.process_candidate(candidate).await? {
                stats.record(&outcome);
            }
        }
        Ok(stats)
    }

    /// Pushes one candidate through every stage and records the outcome.
    ///
    /// Returns `Ok(None)` if the URL was already consumed this run. Failures
    /// and panics inside the stages become [`UrlOutcome::Errored`].
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if the record cannot be written.
    #[instrument(skip(self, candidate), fields(url = %candidate.url, engine = %candidate.engine))]
    pub async fn process_candidate(
        &mut self,
        candidate: &Candidate,
    ) -> Result<Option<UrlOutcome>, ManifestError> {
        if !self.seen.insert(candidate.url.clone()) {
            debug!("already processed this run");
            return Ok(None);
        }

        let mut stage = Stage::Discovered;
        let result = AssertUnwindSafe(self.evaluate(candidate, &mut stage))
            .catch_unwind()
            .await;
        let verdict = match result {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(failure)) => {
                error!(stage = %stage, error = %failure, "processing failed");
                Verdict::new(UrlOutcome::Errored(failure.to_string()))
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                error!(stage = %stage, detail = %detail, "processing panicked");
                Verdict::new(UrlOutcome::Errored(format!("panic at {stage}: {detail}")))
            }
        };

        let mut record = ManifestRecord::new(
            candidate.url.as_str(),
            verdict.outcome.status(),
            verdict.outcome.reason(),
        )
        .with_http_status(verdict.http_status)
        .with_content_type(verdict.content_type);
        if let UrlOutcome::Saved { artifact, .. } = &verdict.outcome {
            record = record.with_saved(artifact.path.clone(), artifact.sha256.clone());
            self.report.add(
                &candidate.url,
                &candidate.category,
                candidate.term.as_deref(),
                artifact,
            );
        }
        self.manifest.record(&record)?;

        info!(
            status = %verdict.outcome.status(),
            reason = %verdict.outcome.reason(),
            stage = %stage,
            "url processed"
        );
        self.stats.record(&verdict.outcome);
        Ok(Some(verdict.outcome))
    }

    fn domain_allowed(&self, domain: &str) -> bool {
        self.settings.allowed_domains.is_empty()
            || self
                .settings
                .allowed_domains
                .iter()
                .any(|allowed| host_within(domain, allowed))
    }

    async fn evaluate(
        &self,
        candidate: &Candidate,
        stage: &mut Stage,
    ) -> Result<Verdict, PipelineError> {
        let url = candidate.url.as_str();
        let max_bytes = self.settings.max_file_bytes;

        if !self.domain_allowed(&extract_domain(url)) {
            return Ok(Verdict::new(UrlOutcome::skipped("domain_not_allowed")));
        }

        let permitted = match self.client.permit(url).await {
            Ok(permitted) => permitted,
            Err(FetchError::InvalidUrl { .. }) => {
                return Ok(Verdict::new(UrlOutcome::skipped("invalid_url")));
            }
            Err(_) => return Ok(Verdict::new(UrlOutcome::skipped("robots_disallow"))),
        };
        *stage = Stage::RobotsChecked;

        let admitted = self.client.admit(permitted).await;
        *stage = Stage::RateGated;

        let head = match self.client.send(admitted, FetchRequest::head()).await {
            Ok(response) => response,
            Err(failure) => {
                info!(error = %failure, "HEAD failed");
                return Ok(Verdict::new(UrlOutcome::skipped("head_failed")));
            }
        };
        *stage = Stage::HeadFetched;

        let head_status = head.status();
        let header_evidence = (200..300).contains(&head_status);
        if head_status >= 400 && !matches!(head_status, 405 | 501) {
            return Ok(Verdict::new(UrlOutcome::skipped(format!("http_{head_status}")))
                .with_response(head_status, head.headers()));
        }

        if header_evidence {
            if head.content_length().is_some_and(|len| len > max_bytes) {
                return Ok(Verdict::new(UrlOutcome::skipped("file_too_large"))
                    .with_response(head_status, head.headers()));
            }
            if !is_pdf_response(head.headers(), &[], url) {
                return Ok(Verdict::new(UrlOutcome::skipped("not_pdf"))
                    .with_response(head_status, head.headers()));
            }
            *stage = Stage::ContentTypeChecked;

            if forbids_indexing(head.headers()) {
                return Ok(
                    Verdict::new(UrlOutcome::rejected(LicenseReason::ForbidsIndexing.as_str()))
                        .with_response(head_status, head.headers()),
                );
            }
            *stage = Stage::RobotsHeaderChecked;
        } else {
            debug!(status = head_status, "no usable HEAD response - deciding on GET");
        }
        drop(head);

        let response = match self.client.fetch(url, FetchRequest::get()).await {
            Ok(response) => response,
            Err(FetchError::RobotsDisallowed { .. }) => {
                return Ok(Verdict::new(UrlOutcome::skipped("robots_disallow")));
            }
            Err(failure) => {
                info!(error = %failure, "GET failed");
                return Ok(Verdict::new(UrlOutcome::skipped(format!(
                    "fetch_failed:{}",
                    failure.code()
                ))));
            }
        };
        *stage = Stage::Fetched;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Ok(Verdict::new(UrlOutcome::skipped(format!("http_{status}")))
                .with_response(status, response.headers()));
        }
        let headers = response.headers().clone();

        let fetched = match response.read_capped(max_bytes).await {
            Ok(fetched) => fetched,
            Err(failure) => {
                info!(error = %failure, "body aborted");
                return Ok(Verdict::new(UrlOutcome::skipped(format!(
                    "stream_error:{}",
                    failure.code()
                )))
                .with_response(status, &headers));
            }
        };
        *stage = Stage::SizeChecked;

        if !has_pdf_content_evidence(&fetched.headers, &fetched.body) {
            return Ok(Verdict::new(UrlOutcome::skipped("not_pdf"))
                .with_response(status, &fetched.headers));
        }

        let domain = extract_domain(&fetched.final_url);
        let decision = self
            .license
            .classify(url, &fetched.headers, &fetched.body, &domain)
            .await;
        *stage = Stage::LicenseChecked;
        if !decision.accept {
            return Ok(Verdict::new(UrlOutcome::rejected(decision.reason.as_str()))
                .with_response(status, &fetched.headers));
        }

        let artifact = self
            .storage
            .save(
                url,
                &fetched.body,
                &candidate.category,
                candidate.term.as_deref(),
            )
            .await
            .map_err(|e| PipelineError::storage(url, e))?;

        Ok(Verdict::new(UrlOutcome::Saved {
            artifact,
            reason: decision.reason.as_str().to_string(),
        })
        .with_response(status, &fetched.headers))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
