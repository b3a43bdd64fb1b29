//! Per-URL stages, outcomes, and run counters.

use std::fmt;

use crate::storage::{ManifestStatus, SavedArtifact};

/// Furthest point a URL reached in the pipeline.
///
/// The robots and rate stages cover the first request only; the GET and any
/// redirect hops are gated again inside the fetch client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Discovered,
    RobotsChecked,
    RateGated,
    HeadFetched,
    ContentTypeChecked,
    RobotsHeaderChecked,
    Fetched,
    SizeChecked,
    LicenseChecked,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::RobotsChecked => "robots_checked",
            Self::RateGated => "rate_gated",
            Self::HeadFetched => "head_fetched",
            Self::ContentTypeChecked => "content_type_checked",
            Self::RobotsHeaderChecked => "robots_header_checked",
            Self::Fetched => "fetched",
            Self::SizeChecked => "size_checked",
            Self::LicenseChecked => "license_checked",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    /// Stored on disk; `reason` is the license decision that allowed it.
    Saved { artifact: SavedArtifact, reason: String },
    /// Policy refusal after inspecting the document.
    Rejected(String),
    /// Policy or transient skip before a decision could be made.
    Skipped(String),
    /// Unexpected failure while processing this URL.
    Errored(String),
}

impl UrlOutcome {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    pub(crate) fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    #[must_use]
    pub fn status(&self) -> ManifestStatus {
        match self {
            Self::Saved { .. } => ManifestStatus::Saved,
            Self::Rejected(_) => ManifestStatus::Rejected,
            Self::Skipped(_) => ManifestStatus::Skipped,
            Self::Errored(_) => ManifestStatus::Error,
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Saved { reason, .. }
            | Self::Rejected(reason)
            | Self::Skipped(reason)
            | Self::Errored(reason) => reason,
        }
    }

    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Outcome counters for a query or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub saved: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: &UrlOutcome) {
        match outcome {
            UrlOutcome::Saved { .. } => self.saved += 1,
            UrlOutcome::Rejected(_) => self.rejected += 1,
            UrlOutcome::Skipped(_) => self.skipped += 1,
            UrlOutcome::Errored(_) => self.errored += 1,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.saved += other.saved;
        self.rejected += other.rejected;
        self.skipped += other.skipped;
        self.errored += other.errored;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.saved + self.rejected + self.skipped + self.errored
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed: {} saved, {} rejected, {} skipped, {} errors",
            self.total(),
            self.saved,
            self.rejected,
            self.skipped,
            self.errored
        )
    }
}
