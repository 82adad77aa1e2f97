//! Server middleware.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::{Method, Request},
    middleware::Next,
    response::IntoResponse,
    response::Response,
};

use super::types::ServerState;
use crate::rate_limit::RateLimiter;

/// Rate limiting for `/api/chat`.
pub async fn chat_rate_limit_middleware(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state, &state.chat_limiter, connect_info, request, next).await
}

/// Rate limiting for the remaining `/api` routes.
pub async fn api_rate_limit_middleware(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state, &state.api_limiter, connect_info, request, next).await
}

async fn enforce(
    state: &ServerState,
    limiter: &RateLimiter,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client_id = state.client_id(request.headers(), connect_info.as_ref());

    match limiter.check_rate_limit(&client_id).await {
        Ok(()) => next.run(request).await,
        Err(e) => {
            // Only log if this is the first warning in the debounce window
            if e.should_log() {
                tracing::warn!(
                    category = "rate_limit",
                    client = %client_id,
                    path = %request.uri().path(),
                    user_agent = ?request.headers().get("user-agent"),
                    wait_seconds = e.wait_seconds,
                    "Rate limit exceeded"
                );
            }
            e.into_response()
        }
    }
}

/// Log every request and feed the per-endpoint counters.
pub async fn request_log_middleware(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let endpoint = endpoint_key(&method, request.extensions().get::<MatchedPath>());
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    let status = response.status();
    tracing::info!(
        category = "http",
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = elapsed.as_millis() as u64,
        "HTTP request"
    );

    if path.starts_with("/api") || path == "/health" {
        state
            .orchestrator
            .metrics()
            .record_request(&endpoint, elapsed, !status.is_server_error())
            .await;
    }

    response
}

/// Metrics key for a request: the route template, never the raw path, so
/// the endpoint table stays bounded whatever clients send.
fn endpoint_key(method: &Method, matched: Option<&MatchedPath>) -> String {
    let known = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::HEAD,
        Method::OPTIONS,
    ];
    let method = if known.contains(method) {
        method.as_str()
    } else {
        "OTHER"
    };
    match matched {
        Some(path) => format!("{} {}", method, path.as_str()),
        None => format!("{} unmatched", method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_key_without_route() {
        assert_eq!(endpoint_key(&Method::GET, None), "GET unmatched");

        let custom = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(endpoint_key(&custom, None), "OTHER unmatched");
    }
}
