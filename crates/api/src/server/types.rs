//! Server state and types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::ConnectInfo, http::HeaderMap};

use wayfarer_agent::ResponseOrchestrator;
use wayfarer_core::config::defaults;
use wayfarer_core::DynLlmClient;
use wayfarer_tools::default_registry;

use crate::config::AppConfig;
use crate::rate_limit::{extract_client_id, RateLimitConfig, RateLimiter};

/// Maximum request body size (10 MB)
pub const MAX_REQUEST_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Server state shared across all handlers.
#[derive(Clone)]
pub struct ServerState {
    /// Conversation store, tools, resilience and metrics live behind this.
    pub orchestrator: Arc<ResponseOrchestrator>,
    /// 20 requests per 5 minutes on `/api/chat`.
    pub chat_limiter: Arc<RateLimiter>,
    /// General budget for the other API routes.
    pub api_limiter: Arc<RateLimiter>,
    /// Directory served for non-API paths.
    pub web_root: PathBuf,
    /// Proxy hops trusted when reading `x-forwarded-for`.
    pub trusted_proxies: usize,
    /// Server start timestamp.
    pub started_at: i64,
}

impl ServerState {
    /// Wire the orchestrator and limiters from configuration.
    pub fn new(config: &AppConfig, llm: DynLlmClient) -> Self {
        let tools = default_registry(&config.tools_config());
        let orchestrator =
            ResponseOrchestrator::new(llm, Arc::new(tools)).with_config(config.orchestrator_config());

        Self::with_parts(
            Arc::new(orchestrator),
            config.chat_rate_limit(),
            config.api_rate_limit(),
            config.server.web_root.clone(),
        )
        .with_trusted_proxies(config.server.trusted_proxies)
    }

    pub fn with_parts(
        orchestrator: Arc<ResponseOrchestrator>,
        chat_limit: RateLimitConfig,
        api_limit: RateLimitConfig,
        web_root: PathBuf,
    ) -> Self {
        Self {
            orchestrator,
            chat_limiter: Arc::new(RateLimiter::with_config(chat_limit)),
            api_limiter: Arc::new(RateLimiter::with_config(api_limit)),
            web_root,
            trusted_proxies: defaults::TRUSTED_PROXIES,
            started_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_trusted_proxies(mut self, trusted_proxies: usize) -> Self {
        self.trusted_proxies = trusted_proxies;
        self
    }

    /// Client identity for rate limiting and web conversations.
    pub fn client_id(
        &self,
        headers: &HeaderMap,
        connect_info: Option<&ConnectInfo<SocketAddr>>,
    ) -> String {
        extract_client_id(headers, connect_info, self.trusted_proxies)
    }

    /// Whole seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        let elapsed = chrono::Utc::now().timestamp() - self.started_at;
        elapsed.max(0) as u64
    }
}
