//! Application router configuration.

use axum::{
    handler::HandlerWithoutStateExt,
    middleware::from_fn_with_state,
    routing::{any, get, post},
    Router,
};
use tower_http::services::ServeDir;

use super::middleware::{
    api_rate_limit_middleware, chat_rate_limit_middleware, request_log_middleware,
};
use super::types::{ServerState, MAX_REQUEST_BODY_SIZE};
use crate::handlers::{
    chat_handler, clear_handler, health_handler, not_found_handler, stats_handler,
};

/// Create the application router with a specific state.
///
/// `/api/chat` sits behind both limiters; the other `/api` routes only
/// behind the general one.
pub fn create_router_with_state(state: ServerState) -> Router {
    let chat_routes = Router::new()
        .route("/api/chat", post(chat_handler))
        .route_layer(from_fn_with_state(state.clone(), chat_rate_limit_middleware));

    let api_routes = Router::new()
        .merge(chat_routes)
        .route("/api/clear", post(clear_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/*rest", any(not_found_handler))
        .route_layer(from_fn_with_state(state.clone(), api_rate_limit_middleware));

    let static_files = ServeDir::new(&state.web_root).fallback(not_found_handler.into_service());

    Router::new()
        .route("/health", get(health_handler))
        .merge(api_routes)
        .layer(from_fn_with_state(state.clone(), request_log_middleware))
        .layer(tower_http::compression::CompressionLayer::new())
        .layer(tower_http::limit::RequestBodyLimitLayer::new(
            MAX_REQUEST_BODY_SIZE,
        ))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .fallback_service(static_files)
        .with_state(state)
}
