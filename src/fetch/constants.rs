//! Constants for the fetch module (timeouts, limits, politeness defaults).

use std::time::Duration;

/// Connect timeout for every request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request timeout for content GETs.
pub const CONTENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout for existence checks (HEAD, robots.txt).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum redirect hops followed when redirects are allowed.
pub const MAX_REDIRECTS: usize = 10;

/// Default global budget: 10 requests per minute, one every 6 seconds.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 10;

/// Default spacing between requests to the same domain.
pub const DEFAULT_DOMAIN_DELAY: Duration = Duration::from_secs(10);

/// Default cap on streamed content (40 MiB).
pub const DEFAULT_MAX_CONTENT_BYTES: u64 = 40 * 1024 * 1024;

/// Warning threshold for cumulative per-domain delay.
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Maximum honoured Retry-After value.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);
