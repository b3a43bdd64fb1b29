//! Global and per-domain request spacing.
//!
//! Two independent limiters compose into [`RateLimits`]:
//!
//! - [`RateLimiter`] enforces a minimum delay between requests to the same
//!   normalized domain.
//! - [`GlobalRateLimiter`] enforces a minimum interval between *any* two
//!   requests, derived from a requests-per-minute budget.
//!
//! Acquisition never fails; it only suspends the caller. The first request to a
//! domain (and the first request of the run) proceeds immediately.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use pdf_harvest::fetch::RateLimits;
//!
//! # async fn example() {
//! let limits = RateLimits::new(10, Duration::from_secs(10));
//!
//! // First request proceeds immediately
//! limits.acquire("https://example.gov/a.pdf").await;
//!
//! // Waits for both the 6s global interval and the 10s domain spacing
//! limits.acquire("https://example.gov/b.pdf").await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{CUMULATIVE_DELAY_WARNING_THRESHOLD, MAX_RETRY_AFTER};

/// Per-domain rate limiter.
///
/// Designed to be shared behind `Arc`. `DashMap` holds per-domain state and a
/// `tokio::sync::Mutex` per domain serializes the read-update of its timing,
/// so same-domain requests stay strictly ordered even if callers run
/// concurrently.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum delay between requests to the same domain.
    default_delay: Duration,

    /// Whether rate limiting is disabled.
    disabled: bool,

    /// Per-domain state. The `Arc` lets us release the `DashMap` shard lock
    /// before awaiting on the inner mutex.
    domains: DashMap<String, Arc<DomainState>>,
}

#[derive(Debug)]
struct DomainState {
    /// `None` until the domain has been requested once.
    last_request: Arc<Mutex<Option<Instant>>>,

    /// Cumulative delay applied to this domain, in milliseconds.
    cumulative_delay_ms: AtomicU64,
}

impl DomainState {
    fn new() -> Self {
        Self {
            last_request: Arc::new(Mutex::new(None)),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

/// A reserved per-domain slot.
///
/// Holds the domain's lock until [`commit`](Self::commit) stamps the request
/// time, so the recorded time is the moment the request is actually issued
/// (after any later waits such as the global interval).
#[derive(Debug)]
#[must_use = "a reserved slot records nothing until committed"]
pub struct DomainSlot {
    guard: Option<OwnedMutexGuard<Option<Instant>>>,
}

impl DomainSlot {
    /// Records "now" as the domain's last request time and releases the slot.
    pub fn commit(mut self) {
        if let Some(mut guard) = self.guard.take() {
            *guard = Some(Instant::now());
        }
    }
}

impl RateLimiter {
    /// Creates a per-domain limiter with the given minimum spacing.
    #[must_use]
    #[instrument(skip_all, fields(delay_ms = default_delay.as_millis()))]
    pub fn new(default_delay: Duration) -> Self {
        debug!("creating per-domain rate limiter");
        Self {
            default_delay,
            disabled: false,
            domains: DashMap::new(),
        }
    }

    /// Creates a limiter that never delays.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            default_delay: Duration::ZERO,
            disabled: true,
            domains: DashMap::new(),
        }
    }

    /// Waits until the URL's domain may be requested again and records now.
    pub async fn acquire(&self, url: &str) {
        self.reserve(url).await.commit();
    }

    /// Waits until the URL's domain may be requested again and returns a slot
    /// that holds the domain until committed.
    #[instrument(skip(self), fields(domain))]
    pub async fn reserve(&self, url: &str) -> DomainSlot {
        if self.disabled {
            return DomainSlot { guard: None };
        }

        let domain = extract_domain(url);
        tracing::Span::current().record("domain", domain.as_str());

        let state = self
            .domains
            .entry(domain.clone())
            .or_insert_with(|| Arc::new(DomainState::new()))
            .clone();

        let guard = Arc::clone(&state.last_request).lock_owned().await;

        if let Some(last_request) = *guard {
            let elapsed = last_request.elapsed();
            if elapsed < self.default_delay {
                let delay = self.default_delay.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(delay);

                debug!(
                    domain = %domain,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying per-domain delay"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        domain = %domain,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "excessive rate limiting - many candidates point at this domain"
                    );
                }

                tokio::time::sleep(delay).await;
            }
        } else {
            debug!(domain = %domain, "first request to domain - no delay");
        }

        DomainSlot { guard: Some(guard) }
    }
}

/// Process-wide request interval gate.
#[derive(Debug)]
pub struct GlobalRateLimiter {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl GlobalRateLimiter {
    /// Creates a gate with an explicit minimum interval between requests.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    /// Creates a gate from a requests-per-minute budget (10 rpm → 6 s).
    ///
    /// A budget of zero is treated as one request per minute.
    #[must_use]
    pub fn from_requests_per_minute(requests_per_minute: u32) -> Self {
        Self::new(interval_for_rpm(requests_per_minute))
    }

    /// Waits until the global interval has elapsed and records now.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let delay = self.interval.saturating_sub(elapsed);
                debug!(delay_ms = delay.as_millis(), "applying global delay");
                tokio::time::sleep(delay).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Minimum interval implied by a requests-per-minute budget.
#[must_use]
pub fn interval_for_rpm(requests_per_minute: u32) -> Duration {
    Duration::from_secs(60) / requests_per_minute.max(1)
}

/// The global and per-domain limiters composed.
///
/// Every outbound request acquires the per-domain slot first, then the global
/// slot, and only then stamps the domain, so both spacing guarantees hold for
/// the actual send times.
#[derive(Debug)]
pub struct RateLimits {
    global: GlobalRateLimiter,
    per_domain: RateLimiter,
}

impl RateLimits {
    /// Creates limits from a global rpm budget and a per-domain spacing.
    #[must_use]
    pub fn new(requests_per_minute: u32, domain_delay: Duration) -> Self {
        Self::from_parts(
            GlobalRateLimiter::from_requests_per_minute(requests_per_minute),
            RateLimiter::new(domain_delay),
        )
    }

    /// Composes two already-built limiters.
    #[must_use]
    pub fn from_parts(global: GlobalRateLimiter, per_domain: RateLimiter) -> Self {
        Self { global, per_domain }
    }

    /// Limits that never delay.
    #[must_use]
    pub fn disabled() -> Self {
        Self::from_parts(GlobalRateLimiter::new(Duration::ZERO), RateLimiter::disabled())
    }

    /// Suspends until a request to `url` is allowed under both limits.
    pub async fn acquire(&self, url: &str) {
        let slot = self.per_domain.reserve(url).await;
        self.global.acquire().await;
        slot.commit();
    }
}

/// Extracts the normalized rate-limiting domain from a URL.
///
/// Lowercases the host and drops a leading `www.`. Returns "unknown" for
/// malformed URLs so they are still rate limited together.
///
/// # Examples
///
/// ```
/// use pdf_harvest::fetch::extract_domain;
///
/// assert_eq!(extract_domain("https://www.Example.GOV/Path"), "example.gov");
/// assert_eq!(extract_domain("https://localhost:8080/x"), "localhost");
/// assert_eq!(extract_domain("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str().map(|host| {
                let host = host.to_ascii_lowercase();
                host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
            })
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parses a Retry-After header value into a Duration.
///
/// Supports integer seconds and HTTP-dates (RFC 7231). Caps at one hour.
/// Returns `None` for unparseable or negative values.
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);
        return Some(duration.min(MAX_RETRY_AFTER));
    }

    let datetime = httpdate::parse_http_date(header_value).ok()?;
    let duration = datetime
        .duration_since(std::time::SystemTime::now())
        .unwrap_or(Duration::ZERO);
    Some(duration.min(MAX_RETRY_AFTER))
}
