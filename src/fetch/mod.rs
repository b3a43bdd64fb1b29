//! Polite network access: robots gate, rate limiters, and a capped HTTP client.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pdf_harvest::fetch::{FetchClient, FetchRequest, RateLimits, RobotsGate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let limits = Arc::new(RateLimits::new(10, Duration::from_secs(10)));
//! let robots = Arc::new(RobotsGate::new("pdf-harvest"));
//! let client = FetchClient::new(limits, robots)?;
//! let result = client
//!     .fetch("https://example.gov/report.pdf", FetchRequest::get())
//!     .await?
//!     .read_capped(40 * 1024 * 1024)
//!     .await?;
//! println!("{} bytes", result.body.len());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
pub mod rate_limiter;
pub mod robots;

pub use client::{
    Admitted, FetchClient, FetchMethod, FetchRequest, FetchResponse, FetchResult, Permitted,
};
pub use error::FetchError;
pub use rate_limiter::{
    GlobalRateLimiter, RateLimiter, RateLimits, extract_domain, interval_for_rpm,
    parse_retry_after,
};
pub use robots::{RobotsEntry, RobotsGate, RobotsRules, origin_for_robots};
