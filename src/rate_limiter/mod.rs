/*!
 * # Rate Limiting Module
 *
 * Fixed-window request throttling keyed by client IP.
 *
 * - One global allowance per window
 * - Path-prefix policies with their own allowance and window (authentication
 *   endpoints get a higher one by default)
 * - Standard `X-RateLimit-*` headers on every throttled route and `Retry-After`
 *   on rejections
 *
 * Counters live in a shared `DashMap`; each policy counts in its own bucket so a
 * client's login attempts do not consume its general allowance.
 *
 * ## Usage
 *
 * ```ignore
 * let layer = RateLimitLayer::new(RateLimitConfig::default())
 *     .with_policies(vec![PathPolicy::new("/api/auth", 300, Duration::from_secs(60))]);
 * let app = Router::new().route("/", get(handler)).layer(layer);
 * ```
 */
use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderValue, Response},
    response::IntoResponse,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Paths that are never throttled.
const EXEMPT_PREFIXES: &[&str] = &["/health", "/swagger-ui", "/api-docs"];

fn num_to_header_value<T: ToString>(n: T) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
    /// Window of the bucket that created the entry; policy buckets share the
    /// map but not the global window.
    window: Duration,
}

impl RateLimitEntry {
    fn new(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            window_start: now,
            window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.window_start) >= self.window
    }

    fn roll(&mut self, now: Instant, window: Duration) {
        self.window = window;
        if self.is_expired(now) {
            self.count = 0;
            self.window_start = now;
        }
    }

    fn time_until_reset(&self, now: Instant) -> Duration {
        self.window
            .saturating_sub(now.duration_since(self.window_start))
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
    pub enable_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, RateLimitEntry>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Same counters, different allowance.
    pub fn with_config(&self, config: RateLimitConfig) -> Self {
        Self {
            entries: self.entries.clone(),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request against `key`. A rejected request is not counted.
    pub fn check_rate_limit(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let limit = self.config.requests_per_window;
        let window = self.config.window_duration;

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry::new(now, window));
        entry.roll(now, window);

        let reset_time = entry.time_until_reset(now);
        if entry.count >= limit {
            return RateLimitResult {
                allowed: false,
                limit,
                remaining: 0,
                reset_time,
            };
        }

        entry.count += 1;
        RateLimitResult {
            allowed: true,
            limit,
            remaining: limit - entry.count,
            reset_time,
        }
    }

    pub fn get_remaining_quota(&self, key: &str) -> u32 {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.config.requests_per_window.saturating_sub(entry.count)
            }
            _ => self.config.requests_per_window,
        }
    }

    pub fn reset(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop entries whose own window has elapsed.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathPolicy {
    pub prefix: String,
    pub requests_per_window: u32,
    pub window_duration: Duration,
}

impl PathPolicy {
    pub fn new(prefix: impl Into<String>, requests_per_window: u32, window: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            requests_per_window,
            window_duration: window,
        }
    }

    /// Prefix match on whole path segments: `/api/auth` covers `/api/auth/login`
    /// but not `/api/authors`.
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.trim_end_matches('/')) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn extract_ip_key(request: &Request) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    format!("ip:{}", client_ip(request.headers(), peer))
}

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

fn apply_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert("X-RateLimit-Limit", num_to_header_value(result.limit));
    headers.insert("X-RateLimit-Remaining", num_to_header_value(result.remaining));
    headers.insert(
        "X-RateLimit-Reset",
        num_to_header_value(result.reset_time.as_secs()),
    );
}

fn rejection(result: &RateLimitResult, enable_headers: bool) -> Response<Body> {
    let mut response = ServiceError::RateLimitExceeded.into_response();
    let headers = response.headers_mut();
    // Round up so clients never retry inside the window.
    let retry_after = result.reset_time.as_secs() + u64::from(result.reset_time.subsec_nanos() > 0);
    headers.insert("Retry-After", num_to_header_value(retry_after.max(1)));
    if enable_headers {
        apply_headers(headers, result);
    }
    response
}

// Layer implementation for tower
#[derive(Clone)]
pub struct RateLimitLayer {
    rate_limiter: RateLimiter,
    path_policies: Arc<Vec<PathPolicy>>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            rate_limiter: RateLimiter::new(config),
            path_policies: Arc::new(Vec::new()),
        }
    }

    /// First matching policy wins.
    pub fn with_policies(mut self, policies: Vec<PathPolicy>) -> Self {
        self.path_policies = Arc::new(policies);
        self
    }

    /// Global allowance, the `/api/auth` policy, then configured path policies.
    /// Unparseable policies are logged and skipped.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let window = Duration::from_secs(config.rate_limit_window_seconds);
        let mut policies = vec![PathPolicy::new(
            "/api/auth",
            config.rate_limit_auth_requests_per_window,
            window,
        )];

        if let Some(raw) = config.rate_limit_path_policies.as_deref() {
            let (parsed, warnings) = parse_path_policies(raw);
            for warning in warnings {
                warn!("{}", warning);
            }
            policies.extend(parsed);
        }

        Self::new(RateLimitConfig {
            requests_per_window: config.rate_limit_requests_per_window,
            window_duration: window,
            enable_headers: true,
        })
        .with_policies(policies)
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

impl<S> tower::Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            rate_limiter: self.rate_limiter.clone(),
            path_policies: self.path_policies.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    rate_limiter: RateLimiter,
    path_policies: Arc<Vec<PathPolicy>>,
}

impl<S> RateLimitService<S> {
    fn limiter_for(&self, path: &str) -> (RateLimiter, Option<String>) {
        match self.path_policies.iter().find(|p| p.matches(path)) {
            Some(policy) => {
                let config = RateLimitConfig {
                    requests_per_window: policy.requests_per_window,
                    window_duration: policy.window_duration,
                    enable_headers: self.rate_limiter.config.enable_headers,
                };
                (
                    self.rate_limiter.with_config(config),
                    Some(policy.prefix.clone()),
                )
            }
            None => (self.rate_limiter.clone(), None),
        }
    }
}

impl<S> tower::Service<Request> for RateLimitService<S>
where
    S: tower::Service<Request, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Take the readied service and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let path = request.uri().path().to_string();
        if is_exempt(&path) {
            return Box::pin(async move { inner.call(request).await });
        }

        let (limiter, bucket) = self.limiter_for(&path);
        let ip_key = extract_ip_key(&request);
        let key = match &bucket {
            Some(prefix) => format!("{}|{}", ip_key, prefix),
            None => ip_key,
        };
        let enable_headers = limiter.config.enable_headers;
        let result = limiter.check_rate_limit(&key);

        Box::pin(async move {
            if !result.allowed {
                warn!(key = %key, path = %path, "rate limit exceeded");
                return Ok(rejection(&result, enable_headers));
            }

            debug!(key = %key, remaining = result.remaining, "rate limit check passed");
            let mut response = inner.call(request).await?;
            if enable_headers {
                apply_headers(response.headers_mut(), &result);
            }
            Ok(response)
        })
    }
}

/// Periodically evicts expired windows.
pub async fn start_cleanup_task(rate_limiter: RateLimiter, interval: Duration) {
    let mut interval_timer = tokio::time::interval(interval);

    loop {
        interval_timer.tick().await;
        rate_limiter.cleanup_expired();
        debug!(
            tracked = rate_limiter.tracked_keys(),
            "rate limiter cleanup completed"
        );
    }
}

/// Errors that can occur when parsing rate limit policy strings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyParseError {
    #[error("Invalid policy format for '{spec}': expected 'path:limit:window_secs', got {parts} parts")]
    InvalidFormat { spec: String, parts: usize },

    #[error("Invalid limit value '{value}' in policy '{spec}': {reason}")]
    InvalidLimit {
        spec: String,
        value: String,
        reason: String,
    },

    #[error("Invalid window duration '{value}' in policy '{spec}': {reason}")]
    InvalidWindow {
        spec: String,
        value: String,
        reason: String,
    },

    #[error("Empty policy specification")]
    EmptySpec,

    #[error("Path policy must start with '/': got '{path}'")]
    InvalidPathFormat { path: String },

    #[error("Window duration must be at least 1 second, got {window_secs}")]
    WindowTooSmall { window_secs: u64 },

    #[error("Limit must be at least 1, got {limit}")]
    LimitTooSmall { limit: u32 },
}

/// Parse a path policy specification string.
///
/// Format: "path:limit:window_secs"
/// Example: "/api/orders:100:60"
pub fn parse_path_policy(spec: &str) -> Result<PathPolicy, PolicyParseError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(PolicyParseError::EmptySpec);
    }

    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 {
        return Err(PolicyParseError::InvalidFormat {
            spec: spec.to_string(),
            parts: parts.len(),
        });
    }

    let path = parts[0].trim();
    if !path.starts_with('/') {
        return Err(PolicyParseError::InvalidPathFormat {
            path: path.to_string(),
        });
    }

    let limit: u32 = parts[1]
        .trim()
        .parse()
        .map_err(|e| PolicyParseError::InvalidLimit {
            spec: spec.to_string(),
            value: parts[1].to_string(),
            reason: format!("{}", e),
        })?;
    if limit < 1 {
        return Err(PolicyParseError::LimitTooSmall { limit });
    }

    let window_secs: u64 =
        parts[2]
            .trim()
            .parse()
            .map_err(|e| PolicyParseError::InvalidWindow {
                spec: spec.to_string(),
                value: parts[2].to_string(),
                reason: format!("{}", e),
            })?;
    if window_secs < 1 {
        return Err(PolicyParseError::WindowTooSmall { window_secs });
    }

    Ok(PathPolicy::new(path, limit, Duration::from_secs(window_secs)))
}

/// Parse comma-separated path policies, collecting a warning per invalid entry.
///
/// Format: "path1:limit1:window1,path2:limit2:window2"
pub fn parse_path_policies(policies_str: &str) -> (Vec<PathPolicy>, Vec<String>) {
    let mut policies = Vec::new();
    let mut warnings = Vec::new();

    for spec in policies_str
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        match parse_path_policy(spec) {
            Ok(policy) => policies.push(policy),
            Err(e) => warnings.push(format!("Skipping invalid path policy '{}': {}", spec, e)),
        }
    }

    (policies, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::{http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    fn limiter(limit: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests_per_window: limit,
            window_duration: Duration::from_secs(60),
            ..Default::default()
        })
    }

    #[test]
    fn first_request_counts_as_one() {
        let limiter = limiter(2);
        let first = limiter.check_rate_limit("ip:1.1.1.1");
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(limiter.check_rate_limit("ip:1.1.1.1").allowed);
        let third = limiter.check_rate_limit("ip:1.1.1.1");
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert_eq!(limiter.get_remaining_quota("ip:1.1.1.1"), 0);
    }

    #[test]
    fn keys_are_independent_and_resettable() {
        let limiter = limiter(1);
        assert!(limiter.check_rate_limit("a").allowed);
        assert!(limiter.check_rate_limit("b").allowed);
        assert!(!limiter.check_rate_limit("a").allowed);
        limiter.reset("a");
        assert!(limiter.check_rate_limit("a").allowed);
    }

    #[test]
    fn expired_windows_start_over() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_window: 1,
            window_duration: Duration::from_millis(20),
            ..Default::default()
        });
        assert!(limiter.check_rate_limit("k").allowed);
        assert!(!limiter.check_rate_limit("k").allowed);
        std::thread::sleep(Duration::from_millis(30));
        limiter.cleanup_expired();
        assert_eq!(limiter.tracked_keys(), 0);
        assert!(limiter.check_rate_limit("k").allowed);
    }

    #[test]
    fn cleanup_keeps_buckets_with_longer_windows() {
        let global = RateLimiter::new(RateLimitConfig {
            requests_per_window: 10,
            window_duration: Duration::from_millis(20),
            ..Default::default()
        });
        let hourly = global.with_config(RateLimitConfig {
            requests_per_window: 1,
            window_duration: Duration::from_secs(3600),
            ..Default::default()
        });

        assert!(global.check_rate_limit("ip:1.1.1.1").allowed);
        assert!(hourly.check_rate_limit("ip:1.1.1.1|/api/orders").allowed);
        assert!(!hourly.check_rate_limit("ip:1.1.1.1|/api/orders").allowed);

        std::thread::sleep(Duration::from_millis(30));
        global.cleanup_expired();
        assert_eq!(global.tracked_keys(), 1);
        assert!(!hourly.check_rate_limit("ip:1.1.1.1|/api/orders").allowed);
    }

    #[test]
    fn overrides_share_underlying_store() {
        let base = limiter(2);
        let strict = base.with_config(RateLimitConfig {
            requests_per_window: 1,
            ..base.config().clone()
        });
        assert!(base.check_rate_limit("shared").allowed);
        assert!(!strict.check_rate_limit("shared").allowed);
    }

    #[test]
    fn client_ip_precedence() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "10.0.0.9");
        assert_eq!(client_ip(&headers, None), "unknown");

        headers.insert("x-real-ip", "192.168.1.4".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)), "192.168.1.4");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.1.1.1".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn policy_prefix_matches_whole_segments() {
        let policy = PathPolicy::new("/api/auth", 5, Duration::from_secs(60));
        assert!(policy.matches("/api/auth"));
        assert!(policy.matches("/api/auth/login"));
        assert!(!policy.matches("/api/authors"));
        assert!(!policy.matches("/api/items"));
    }

    #[test]
    fn test_parse_valid_path_policy() {
        let policy = parse_path_policy(" /api/orders : 100 : 60 ").unwrap();
        assert_eq!(policy.prefix, "/api/orders");
        assert_eq!(policy.requests_per_window, 100);
        assert_eq!(policy.window_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_invalid_path_policies() {
        assert_matches!(parse_path_policy(""), Err(PolicyParseError::EmptySpec));
        assert_matches!(
            parse_path_policy("/api/orders:100"),
            Err(PolicyParseError::InvalidFormat { parts: 2, .. })
        );
        assert_matches!(
            parse_path_policy("api/orders:100:60"),
            Err(PolicyParseError::InvalidPathFormat { .. })
        );
        assert_matches!(
            parse_path_policy("/api/orders:many:60"),
            Err(PolicyParseError::InvalidLimit { .. })
        );
        assert_matches!(
            parse_path_policy("/api/orders:0:60"),
            Err(PolicyParseError::LimitTooSmall { limit: 0 })
        );
        assert_matches!(
            parse_path_policy("/api/orders:10:0"),
            Err(PolicyParseError::WindowTooSmall { window_secs: 0 })
        );
    }

    #[test]
    fn test_parse_multiple_path_policies() {
        let (policies, warnings) = parse_path_policies("/api/orders:10:60, bogus ,/api/gallery:5:30");
        assert_eq!(policies.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert_eq!(policies[1].prefix, "/api/gallery");
    }

    fn app(layer: RateLimitLayer) -> Router {
        Router::new()
            .route("/api/items", get(|| async { "items" }))
            .route("/api/auth/login", get(|| async { "login" }))
            .route("/health", get(|| async { "ok" }))
            .layer(layer)
    }

    fn from_ip(path: &str, ip: &str) -> Request {
        Request::builder()
            .uri(path)
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn layer_rejects_after_limit_with_headers() {
        let app = app(RateLimitLayer::new(RateLimitConfig {
            requests_per_window: 2,
            ..Default::default()
        }));

        for expected_remaining in ["1", "0"] {
            let response = app.clone().oneshot(from_ip("/api/items", "1.2.3.4")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["X-RateLimit-Limit"], "2");
            assert_eq!(response.headers()["X-RateLimit-Remaining"], expected_remaining);
        }

        let response = app.clone().oneshot(from_ip("/api/items", "1.2.3.4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("Retry-After"));
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");

        // Another client is unaffected, health is exempt.
        let other = app.clone().oneshot(from_ip("/api/items", "5.6.7.8")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
        let health = app.oneshot(from_ip("/health", "1.2.3.4")).await.unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        assert!(!health.headers().contains_key("X-RateLimit-Limit"));
    }

    #[tokio::test]
    async fn auth_paths_use_their_own_allowance() {
        let layer = RateLimitLayer::new(RateLimitConfig {
            requests_per_window: 1,
            ..Default::default()
        })
        .with_policies(vec![PathPolicy::new("/api/auth", 3, Duration::from_secs(60))]);
        let app = app(layer);

        for _ in 0..3 {
            let response = app.clone().oneshot(from_ip("/api/auth/login", "9.9.9.9")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["X-RateLimit-Limit"], "3");
        }
        let response = app.clone().oneshot(from_ip("/api/auth/login", "9.9.9.9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // The general bucket is still untouched.
        let response = app.oneshot(from_ip("/api/items", "9.9.9.9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
