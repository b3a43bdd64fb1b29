//! Rate-limited, robots-gated HTTP client.
//!
//! Every request made through [`FetchClient::fetch`] is checked against the
//! robots gate and then waits on both rate limiters before it is sent. Bodies
//! are read with [`FetchResponse::read_capped`], which refuses oversized
//! payloads up front from `Content-Length` and aborts the stream once the cap
//! is crossed.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{
    CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, LOCATION, USER_AGENT,
};
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT, CONTENT_TIMEOUT, MAX_REDIRECTS, PROBE_TIMEOUT};
use super::error::FetchError;
use super::rate_limiter::RateLimits;
use super::robots::RobotsGate;
use crate::user_agent;

/// HTTP method used for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    /// Existence and header check.
    Head,
    /// Full content retrieval.
    Get,
}

impl FetchMethod {
    fn as_reqwest(self) -> Method {
        match self {
            Self::Head => Method::HEAD,
            Self::Get => Method::GET,
        }
    }
}

/// Options for one request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// HTTP method.
    pub method: FetchMethod,
    /// Whether 3xx responses are followed (up to the redirect limit).
    pub allow_redirects: bool,
    /// Whole-request timeout, including the body.
    pub timeout: Duration,
    /// Extra headers added on top of the rotated browser headers.
    pub headers: HeaderMap,
}

impl FetchRequest {
    /// A HEAD probe that does not follow redirects.
    #[must_use]
    pub fn head() -> Self {
        Self {
            method: FetchMethod::Head,
            allow_redirects: false,
            timeout: PROBE_TIMEOUT,
            headers: HeaderMap::new(),
        }
    }

    /// A content GET that follows redirects.
    #[must_use]
    pub fn get() -> Self {
        Self {
            method: FetchMethod::Get,
            allow_redirects: true,
            timeout: CONTENT_TIMEOUT,
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a request header. Later values replace earlier ones.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A response whose body has not been read yet.
#[derive(Debug)]
pub struct FetchResponse {
    requested_url: String,
    response: reqwest::Response,
}

impl FetchResponse {
    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.response.status().as_u16()
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// URL after redirects.
    #[must_use]
    pub fn final_url(&self) -> &str {
        self.response.url().as_str()
    }

    /// Returns a header value as text, if present and valid ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_str(self.headers(), name)
    }

    /// Declared `Content-Length`, if any.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        declared_length(self.headers())
    }

    /// Reads the whole body, refusing anything larger than `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::TooLarge`] when the declared or streamed size
    /// exceeds the cap, or a body/timeout error if the stream fails. Nothing
    /// read so far is returned on error.
    pub async fn read_capped(self, max_bytes: u64) -> Result<FetchResult, FetchError> {
        let url = self.requested_url;
        if let Some(declared) = declared_length(self.response.headers())
            && declared > max_bytes
        {
            debug!(url = %url, declared, max_bytes, "declared length over cap");
            return Err(FetchError::too_large(url, max_bytes));
        }

        let status = self.response.status().as_u16();
        let headers = self.response.headers().clone();
        let final_url = self.response.url().to_string();

        let mut body = Vec::new();
        let mut stream = self.response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::body(url.clone(), e))?;
            if body.len() as u64 + chunk.len() as u64 > max_bytes {
                debug!(url = %url, max_bytes, "stream crossed cap - aborting");
                return Err(FetchError::too_large(url, max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchResult {
            status,
            headers,
            final_url,
            body,
        })
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// URL after redirects.
    pub final_url: String,
    /// Body bytes (never more than the cap it was read with).
    pub body: Vec<u8>,
}

impl FetchResult {
    /// `Content-Type` header, if present.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// A URL that passed the robots gate.
#[derive(Debug, Clone)]
pub struct Permitted {
    url: Url,
}

/// A permitted URL whose rate slots have been taken. Sending it uses them up.
#[derive(Debug)]
pub struct Admitted {
    url: Url,
}

/// The only path by which the crawler talks to the network.
///
/// Redirects are followed here, one hop at a time, so every hop passes the
/// robots gate and both rate limiters like a first request would.
#[derive(Debug)]
pub struct FetchClient {
    http: Client,
    limits: Arc<RateLimits>,
    robots: Arc<RobotsGate>,
}

impl FetchClient {
    /// Builds a client over the shared limiters and robots gate.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend or system
    /// configuration cannot be initialised.
    pub fn new(limits: Arc<RateLimits>, robots: Arc<RobotsGate>) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .gzip(true)
            .redirect(Policy::none())
            .build()?;
        Ok(Self {
            http,
            limits,
            robots,
        })
    }

    /// Shared robots gate.
    #[must_use]
    pub fn robots(&self) -> &RobotsGate {
        &self.robots
    }

    /// Checks `url` against the robots gate.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if the URL does not parse or is not http(s)
    /// - [`FetchError::RobotsDisallowed`] if robots rules (or a fail-closed
    ///   entry) refuse it
    pub async fn permit(&self, url: &str) -> Result<Permitted, FetchError> {
        let parsed = parse_http_url(url)?;
        if !self.robots.can_fetch(parsed.as_str(), self).await {
            return Err(FetchError::robots_disallowed(url));
        }
        Ok(Permitted { url: parsed })
    }

    /// Waits on the per-domain and global limiters for a permitted URL.
    pub async fn admit(&self, permitted: Permitted) -> Admitted {
        self.limits.acquire(permitted.url.as_str()).await;
        Admitted { url: permitted.url }
    }

    /// Permits, admits, and sends one request.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    ///
    /// # Errors
    ///
    /// See [`FetchClient::permit`] and [`FetchClient::send`].
    #[instrument(skip(self, request), fields(method = ?request.method))]
    pub async fn fetch(
        &self,
        url: &str,
        request: FetchRequest,
    ) -> Result<FetchResponse, FetchError> {
        let permitted = self.permit(url).await?;
        let admitted = self.admit(permitted).await;
        self.send(admitted, request).await
    }

    /// Sends an admitted request, following redirects if the request allows it.
    ///
    /// # Errors
    ///
    /// - [`FetchError::RobotsDisallowed`] / [`FetchError::InvalidUrl`] for a
    ///   redirect target the gate refuses
    /// - [`FetchError::TooManyRedirects`] past the hop limit
    /// - [`FetchError::Timeout`] / [`FetchError::Network`] on transport failure
    pub async fn send(
        &self,
        admitted: Admitted,
        request: FetchRequest,
    ) -> Result<FetchResponse, FetchError> {
        let requested_url = admitted.url.to_string();
        let max_hops = if request.allow_redirects { MAX_REDIRECTS } else { 0 };
        let mut method = request.method.as_reqwest();
        let mut headers = user_agent::browser_headers();
        headers.extend(request.headers);

        let mut current = admitted.url;
        let mut hops = 0;
        loop {
            debug!(url = %current, hop = hops, "sending request");
            let response = self
                .http
                .request(method.clone(), current.clone())
                .headers(headers.clone())
                .timeout(request.timeout)
                .send()
                .await
                .map_err(|e| FetchError::network(current.as_str(), e))?;
            let status = response.status().as_u16();
            debug!(status, "response received");

            let next = if max_hops > 0 {
                redirect_target(&current, status, response.headers())
            } else {
                None
            };
            let Some(next) = next else {
                return Ok(FetchResponse {
                    requested_url,
                    response,
                });
            };
            if hops == max_hops {
                return Err(FetchError::too_many_redirects(requested_url, max_hops));
            }
            hops += 1;
            if status == 303 && method != Method::HEAD {
                method = Method::GET;
            }
            debug!(from = %current, to = %next, "following redirect");
            let permitted = self.permit(next.as_str()).await?;
            current = self.admit(permitted).await.url;
        }
    }

    /// Fetches robots.txt under the tool's own identity.
    ///
    /// Rate limited like every other request (redirect hops included) but
    /// never robots-gated itself. Returns the raw, possibly truncated, body.
    pub(crate) async fn get_robots_txt(
        &self,
        robots_url: &str,
        max_bytes: u64,
    ) -> Result<(u16, Vec<u8>), FetchError> {
        let mut current = parse_http_url(robots_url)?;
        let mut hops = 0;
        let response = loop {
            self.limits.acquire(current.as_str()).await;
            let response = self
                .http
                .get(current.clone())
                .header(USER_AGENT, user_agent::identity_user_agent())
                .timeout(PROBE_TIMEOUT)
                .send()
                .await
                .map_err(|e| FetchError::network(robots_url, e))?;
            let status = response.status().as_u16();
            match redirect_target(&current, status, response.headers()) {
                Some(_) if hops == MAX_REDIRECTS => {
                    return Err(FetchError::too_many_redirects(robots_url, MAX_REDIRECTS));
                }
                Some(next) => {
                    hops += 1;
                    current = next;
                }
                None => break response,
            }
        };

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Ok((status, Vec::new()));
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::body(robots_url, e))?;
            let room = usize::try_from(max_bytes)
                .unwrap_or(usize::MAX)
                .saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if room <= chunk.len() {
                break;
            }
        }
        Ok((status, body))
    }
}

fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(FetchError::invalid_url(url));
    }
    Ok(parsed)
}

/// Resolves the `Location` of a followable redirect against the current URL.
fn redirect_target(current: &Url, status: u16, headers: &HeaderMap) -> Option<Url> {
    if !matches!(status, 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    let location = headers.get(LOCATION)?.to_str().ok()?;
    current.join(location.trim()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use std::sync::Mutex;
    use std::time::Instant;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Responder that records when each request arrived.
    #[derive(Clone)]
    struct Stamped {
        log: Arc<Mutex<Vec<(String, Instant)>>>,
        template: ResponseTemplate,
    }

    impl Respond for Stamped {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let label = format!("{} {}", request.method, request.url.path());
            self.log.lock().unwrap().push((label, Instant::now()));
            self.template.clone()
        }
    }

    fn test_client() -> FetchClient {
        FetchClient::new(
            Arc::new(RateLimits::disabled()),
            Arc::new(RobotsGate::new("pdf-harvest")),
        )
        .unwrap()
    }

    async fn mount_open_robots(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    #[test]
    fn test_fetch_request_defaults() {
        let head = FetchRequest::head();
        assert_eq!(head.method, FetchMethod::Head);
        assert!(!head.allow_redirects);
        assert_eq!(head.timeout, PROBE_TIMEOUT);

        let get = FetchRequest::get().with_timeout(Duration::from_secs(5));
        assert_eq!(get.method, FetchMethod::Get);
        assert!(get.allow_redirects);
        assert_eq!(get.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_scheme() {
        let client = test_client();
        let result = client.fetch("ftp://example.gov/a.pdf", FetchRequest::get()).await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_fetch_reads_body_and_headers() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_open_robots(&server).await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7 body".to_vec(), "application/pdf"),
            )
            .mount(&server)
            .await;

        let client = test_client();
        let url = format!("{}/doc.pdf", server.uri());
        let response = client.fetch(&url, FetchRequest::get()).await.unwrap();
        assert_eq!(response.status(), 200);
        let result = response.read_capped(1024).await.unwrap();
        assert_eq!(result.content_type(), Some("application/pdf"));
        assert_eq!(result.body, b"%PDF-1.7 body");
        assert_eq!(result.final_url, url);
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_open_robots(&server).await;
        Mock::given(method("HEAD"))
            .and(path("/a.pdf"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = test_client();
        client
            .fetch(&format!("{}/a.pdf", server.uri()), FetchRequest::head())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let head = requests
            .iter()
            .find(|r| r.method.as_str() == "HEAD")
            .unwrap();
        let ua = head.headers.get("user-agent").unwrap().to_str().unwrap();
        assert!(ua.starts_with("Mozilla/5.0"), "unexpected UA: {ua}");

        let robots = requests
            .iter()
            .find(|r| r.url.path() == "/robots.txt")
            .unwrap();
        let robots_ua = robots.headers.get("user-agent").unwrap().to_str().unwrap();
        assert!(robots_ua.starts_with("pdf-harvest/"), "unexpected UA: {robots_ua}");
    }

    #[tokio::test]
    async fn test_fetch_extra_headers_are_sent() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_open_robots(&server).await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(header("x-subscription-token", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client();
        let request = FetchRequest::get().with_header(
            HeaderName::from_static("x-subscription-token"),
            HeaderValue::from_static("secret"),
        );
        let response = client
            .fetch(&format!("{}/api", server.uri()), request)
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_head_does_not_follow_redirects() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_open_robots(&server).await;
        Mock::given(method("HEAD"))
            .and(path("/moved.pdf"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/elsewhere.pdf"),
            )
            .mount(&server)
            .await;

        let client = test_client();
        let response = client
            .fetch(&format!("{}/moved.pdf", server.uri()), FetchRequest::head())
            .await
            .unwrap();
        assert_eq!(response.status(), 302);
    }

    #[tokio::test]
    async fn test_get_follows_redirects() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_open_robots(&server).await;
        Mock::given(method("GET"))
            .and(path("/moved.pdf"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/final.pdf"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/final.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .mount(&server)
            .await;

        let client = test_client();
        let response = client
            .fetch(&format!("{}/moved.pdf", server.uri()), FetchRequest::get())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.final_url().ends_with("/final.pdf"));
    }

    #[tokio::test]
    async fn test_read_capped_refuses_declared_oversize() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_open_robots(&server).await;
        Mock::given(method("GET"))
            .and(path("/big.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
            .mount(&server)
            .await;

        let client = test_client();
        let response = client
            .fetch(&format!("{}/big.pdf", server.uri()), FetchRequest::get())
            .await
            .unwrap();
        assert_eq!(response.content_length(), Some(4096));
        let result = response.read_capped(1024).await;
        assert!(matches!(result, Err(FetchError::TooLarge { limit: 1024, .. })));
    }

    #[tokio::test]
    async fn test_read_capped_accepts_exact_cap() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_open_robots(&server).await;
        Mock::given(method("GET"))
            .and(path("/exact.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 1024]))
            .mount(&server)
            .await;

        let client = test_client();
        let result = client
            .fetch(&format!("{}/exact.pdf", server.uri()), FetchRequest::get())
            .await
            .unwrap()
            .read_capped(1024)
            .await
            .unwrap();
        assert_eq!(result.body.len(), 1024);
    }

    #[tokio::test]
    async fn test_fetch_refused_by_robots() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client();
        let result = client
            .fetch(&format!("{}/doc.pdf", server.uri()), FetchRequest::get())
            .await;
        assert!(matches!(result, Err(FetchError::RobotsDisallowed { .. })));
    }

    #[tokio::test]
    async fn test_redirect_hop_is_robots_gated() {
        let Some(origin) = start_mock_server_or_skip().await else {
            return;
        };
        let Some(target) = start_mock_server_or_skip().await else {
            return;
        };
        mount_open_robots(&origin).await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
            .expect(1)
            .mount(&target)
            .await;
        Mock::given(method("GET"))
            .and(path("/x.pdf"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/secret.pdf", target.uri()).as_str()),
            )
            .mount(&origin)
            .await;
        Mock::given(path("/secret.pdf"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&target)
            .await;

        let client = test_client();
        let result = client
            .fetch(&format!("{}/x.pdf", origin.uri()), FetchRequest::get())
            .await;
        match result {
            Err(FetchError::RobotsDisallowed { url }) => assert!(url.ends_with("/secret.pdf")),
            other => panic!("expected robots refusal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_redirect_limit_is_enforced() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_open_robots(&server).await;
        Mock::given(method("GET"))
            .and(path("/loop.pdf"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop.pdf"))
            .expect(u64::try_from(MAX_REDIRECTS + 1).unwrap())
            .mount(&server)
            .await;

        let client = test_client();
        let result = client
            .fetch(&format!("{}/loop.pdf", server.uri()), FetchRequest::get())
            .await;
        assert!(matches!(result, Err(FetchError::TooManyRedirects { limit: MAX_REDIRECTS, .. })));
    }

    #[tokio::test]
    async fn test_requests_to_one_domain_are_spaced_across_redirects() {
        let Some(origin) = start_mock_server_or_skip().await else {
            return;
        };
        let Some(target) = start_mock_server_or_skip().await else {
            return;
        };
        let log = Arc::new(Mutex::new(Vec::new()));
        let stamped = |template: ResponseTemplate| Stamped {
            log: Arc::clone(&log),
            template,
        };
        for server in [&origin, &target] {
            Mock::given(method("GET"))
                .and(path("/robots.txt"))
                .respond_with(stamped(ResponseTemplate::new(404)))
                .mount(server)
                .await;
        }
        Mock::given(path("/doc.pdf"))
            .respond_with(stamped(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/cdn/doc.pdf", target.uri()).as_str()),
            ))
            .mount(&origin)
            .await;
        Mock::given(path("/cdn/doc.pdf"))
            .respond_with(stamped(
                ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
            ))
            .mount(&target)
            .await;

        // Both mock servers live on 127.0.0.1, so they share one rate domain.
        let delay = Duration::from_millis(250);
        let client = FetchClient::new(
            Arc::new(RateLimits::new(600, delay)),
            Arc::new(RobotsGate::new("pdf-harvest")),
        )
        .unwrap();
        let url = format!("{}/doc.pdf", origin.uri());
        let head = client.fetch(&url, FetchRequest::head()).await.unwrap();
        assert_eq!(head.status(), 302);
        let get = client.fetch(&url, FetchRequest::get()).await.unwrap();
        assert_eq!(get.status(), 200);
        assert!(get.final_url().ends_with("/cdn/doc.pdf"));

        let log = log.lock().unwrap();
        let labels: Vec<&str> = log.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "GET /robots.txt",
                "HEAD /doc.pdf",
                "GET /doc.pdf",
                "GET /robots.txt",
                "GET /cdn/doc.pdf",
            ]
        );
        let tolerance = Duration::from_millis(20);
        for pair in log.windows(2) {
            let gap = pair[1].1.duration_since(pair[0].1);
            assert!(
                gap + tolerance >= delay,
                "{} -> {} only {gap:?} apart",
                pair[0].0,
                pair[1].0
            );
        }
    }
}
