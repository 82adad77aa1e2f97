//! Sliding-window rate limiting keyed by client address.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::ConnectInfo,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;
use tokio::time::Instant;

use wayfarer_core::config::defaults;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub per_duration: Duration,
    /// Minimum duration between warning logs for the same client
    pub warn_interval: Duration,
    /// Body `error` text returned with the 429.
    pub message: &'static str,
}

impl RateLimitConfig {
    /// General API budget: 100 requests per 15 minutes.
    pub fn api() -> Self {
        Self {
            max_requests: defaults::RATE_LIMIT_MAX_REQUESTS,
            per_duration: Duration::from_millis(defaults::RATE_LIMIT_WINDOW_MS),
            warn_interval: Duration::from_secs(5),
            message: "Too many requests, please try again later",
        }
    }

    /// Chat budget: 20 requests per 5 minutes.
    pub fn chat() -> Self {
        Self {
            max_requests: defaults::CHAT_RATE_LIMIT_MAX_REQUESTS,
            per_duration: Duration::from_millis(defaults::CHAT_RATE_LIMIT_WINDOW_MS),
            warn_interval: Duration::from_secs(5),
            message: "Too many chat requests, please slow down",
        }
    }

    pub fn with_budget(mut self, max_requests: u32, per_duration: Duration) -> Self {
        self.max_requests = max_requests;
        self.per_duration = per_duration;
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::api()
    }
}

/// Rate limiter state.
#[derive(Clone)]
pub struct RateLimiter {
    /// Map of client identifier -> request history
    clients: Arc<RwLock<HashMap<String, ClientState>>>,
    config: RateLimitConfig,
}

struct ClientState {
    history: Vec<Instant>,
    last_warning: Option<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a request for `client_key`, or reject it when the window is full.
    pub async fn check_rate_limit(&self, client_key: &str) -> Result<(), RateLimitExceeded> {
        let mut clients = self.clients.write().await;
        let now = Instant::now();

        let state = clients
            .entry(client_key.to_string())
            .or_insert_with(|| ClientState {
                history: Vec::new(),
                last_warning: None,
            });

        let window = self.config.per_duration;
        state
            .history
            .retain(|&timestamp| now.saturating_duration_since(timestamp) < window);

        if state.history.len() >= self.config.max_requests as usize {
            let oldest = state.history.first().copied().unwrap_or(now);
            let wait = window.saturating_sub(now.saturating_duration_since(oldest));

            // Debounce the warning per client
            let should_log = state
                .last_warning
                .is_none_or(|last| now.saturating_duration_since(last) >= self.config.warn_interval);
            if should_log {
                state.last_warning = Some(now);
            }

            return Err(RateLimitExceeded {
                // Round up so clients never retry a moment too early
                wait_seconds: wait.as_secs() + u64::from(wait.subsec_nanos() > 0),
                message: self.config.message,
                should_log,
            });
        }

        state.history.push(now);
        state.last_warning = None;
        Ok(())
    }

    /// Drop clients with no requests inside the window.
    pub async fn cleanup_old_entries(&self) -> usize {
        let mut clients = self.clients.write().await;
        let now = Instant::now();
        let window = self.config.per_duration;
        let before = clients.len();

        clients.retain(|_key, state| {
            state
                .history
                .retain(|&timestamp| now.saturating_duration_since(timestamp) < window);
            !state.history.is_empty()
        });

        before - clients.len()
    }

    /// Number of tracked clients.
    pub async fn tracked_clients(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limit exceeded error.
#[derive(Debug)]
pub struct RateLimitExceeded {
    pub wait_seconds: u64,
    message: &'static str,
    should_log: bool,
}

impl RateLimitExceeded {
    pub fn should_log(&self) -> bool {
        self.should_log
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "retry_after": self.wait_seconds,
        });
        (
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", self.wait_seconds.to_string())],
            axum::Json(body),
        )
            .into_response()
    }
}

/// Identify the client behind a request.
///
/// Each trusted proxy appends the address it received the request from to
/// `x-forwarded-for`, so only the last `trusted_proxies` hops are reliable.
/// The client is the hop just left of those (the leftmost when the chain
/// is shorter). With no trusted proxies the header is ignored and the
/// socket address is used. Web users are keyed by this value in the
/// conversation store too.
pub fn extract_client_id(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trusted_proxies: usize,
) -> String {
    if trusted_proxies > 0 {
        let hops: Vec<&str> = headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        if !hops.is_empty() {
            let index = hops.len().saturating_sub(trusted_proxies);
            return hops[index].to_string();
        }
    }

    if let Some(info) = connect_info {
        return info.0.ip().to_string();
    }

    "unknown".to_string()
}

/// Background task to periodically clean up old rate limit entries.
pub async fn cleanup_task(limiters: Vec<Arc<RateLimiter>>, interval: Duration) {
    let mut interval_timer = tokio::time::interval(interval);
    loop {
        interval_timer.tick().await;
        for limiter in &limiters {
            limiter.cleanup_old_entries().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn tiny(max_requests: u32) -> RateLimiter {
        RateLimiter::with_config(
            RateLimitConfig::chat().with_budget(max_requests, Duration::from_secs(10)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_window() {
        let limiter = tiny(2);

        assert!(limiter.check_rate_limit("client1").await.is_ok());
        assert!(limiter.check_rate_limit("client1").await.is_ok());

        let err = limiter.check_rate_limit("client1").await.unwrap_err();
        assert_eq!(err.wait_seconds, 10);
        assert_eq!(err.message(), "Too many chat requests, please slow down");

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(limiter.check_rate_limit("client1").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = tiny(1);
        assert!(limiter.check_rate_limit("a").await.is_ok());
        assert!(limiter.check_rate_limit("a").await.is_err());
        assert!(limiter.check_rate_limit("b").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_warning_is_debounced() {
        let limiter = tiny(1);
        limiter.check_rate_limit("a").await.unwrap();

        assert!(limiter.check_rate_limit("a").await.unwrap_err().should_log());
        assert!(!limiter.check_rate_limit("a").await.unwrap_err().should_log());

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(limiter.check_rate_limit("a").await.unwrap_err().should_log());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_idle_clients() {
        let limiter = tiny(5);
        limiter.check_rate_limit("a").await.unwrap();
        limiter.check_rate_limit("b").await.unwrap();
        assert_eq!(limiter.tracked_clients().await, 2);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(limiter.cleanup_old_entries().await, 2);
        assert_eq!(limiter.tracked_clients().await, 0);
    }

    #[test]
    fn test_default_budgets() {
        let api = RateLimitConfig::api();
        assert_eq!(api.max_requests, 100);
        assert_eq!(api.per_duration, Duration::from_secs(15 * 60));

        let chat = RateLimitConfig::chat();
        assert_eq!(chat.max_requests, 20);
        assert_eq!(chat.per_duration, Duration::from_secs(5 * 60));
    }

    #[test]
    fn test_extract_client_id() {
        let mut headers = HeaderMap::new();
        let addr: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        let info = ConnectInfo(addr);

        assert_eq!(extract_client_id(&headers, Some(&info), 1), "10.1.2.3");
        assert_eq!(extract_client_id(&headers, None, 1), "unknown");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        // The proxy appended the real peer; the leftmost hop is client supplied
        assert_eq!(extract_client_id(&headers, Some(&info), 1), "10.0.0.1");
        assert_eq!(extract_client_id(&headers, Some(&info), 2), "203.0.113.7");
        assert_eq!(extract_client_id(&headers, Some(&info), 5), "203.0.113.7");
        assert_eq!(extract_client_id(&headers, Some(&info), 0), "10.1.2.3");
    }

    #[test]
    fn test_extract_client_id_joins_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append("x-forwarded-for", HeaderValue::from_static("198.51.100.1"));
        headers.append("x-forwarded-for", HeaderValue::from_static("192.0.2.44"));

        assert_eq!(extract_client_id(&headers, None, 1), "192.0.2.44");
    }
}
