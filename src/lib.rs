//! PDF harvesting library.
//!
//! Turns search terms and seed pages into a vetted, categorized PDF library
//! with an append-only audit trail. Each candidate URL is robots-gated, rate
//! limited, verified as a PDF, checked against a conservative license
//! heuristic, and then either stored or recorded with the reason it was not.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - rate limiters, robots gate, and the only HTTP client
//! - [`discovery`] - search scraping, seed pages, and API search engines
//! - [`classify`] - URL and payload PDF checks
//! - [`license`] - header and text based license acceptance
//! - [`storage`] - content-addressed files, CSV manifest, run report
//! - [`pipeline`] - the per-URL state machine
//! - [`config`] - catalog file and CLI overrides

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod config;
pub mod discovery;
pub mod fetch;
pub mod license;
pub mod pipeline;
pub mod storage;
pub mod user_agent;
pub mod util;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, HarvestConfig};
pub use discovery::{Candidate, DiscoveryEngine, DiscoveryQuery, DiscoveryRegistry};
pub use fetch::{FetchClient, FetchError, RateLimits, RobotsGate};
pub use license::{LicenseDecision, LicenseHeuristic, LicenseReason};
pub use pipeline::{Pipeline, PipelineSettings, RunStats, UrlOutcome};
pub use storage::{Manifest, ManifestRecord, ManifestStatus, Storage};
