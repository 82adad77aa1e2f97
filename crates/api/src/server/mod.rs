//! Web server for the Wayfarer travel assistant.
//!
//! Serves the chat API and the static web client, and optionally runs the
//! Telegram bot in the same process.

pub mod middleware;
pub mod router;
pub mod types;

pub use router::create_router_with_state;
pub use types::{ServerState, MAX_REQUEST_BODY_SIZE};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use wayfarer_agent::spawn_cleanup;
use wayfarer_core::config::defaults;
use wayfarer_llm::OpenAiClient;

use crate::config::AppConfig;
use crate::telegram::TelegramBot;

/// Options that only make sense for a running server.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub telegram: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { telegram: true }
    }
}

/// Run the web server with graceful shutdown.
pub async fn run(config: AppConfig, options: RunOptions) -> anyhow::Result<()> {
    let llm = OpenAiClient::new(config.openai_config()).context("failed to create LLM client")?;
    let state = ServerState::new(&config, Arc::new(llm));

    tracing::info!(
        category = "startup",
        model = state.orchestrator.model_name(),
        tools = ?state.orchestrator.tools().availability(),
        environment = ?config.environment,
        "Wayfarer starting"
    );

    let mut background = Vec::new();

    let sweep = Duration::from_secs(defaults::CONVERSATION_CLEANUP_INTERVAL_SECS);
    if let Some(handle) = spawn_cleanup(state.orchestrator.conversations().clone(), sweep) {
        background.push(handle);
    }

    // Rate limit cleanup every 5 minutes
    let limiters = vec![state.chat_limiter.clone(), state.api_limiter.clone()];
    background.push(tokio::spawn(crate::rate_limit::cleanup_task(
        limiters,
        Duration::from_secs(300),
    )));

    match (&config.telegram.bot_token, options.telegram) {
        (Some(token), true) => {
            background.push(TelegramBot::new(token, state.orchestrator.clone()).spawn());
        }
        (Some(_), false) => tracing::info!("Telegram bot disabled by --no-telegram"),
        (None, _) => tracing::info!("Telegram bot not initialized - token not provided"),
    }

    let app = create_router_with_state(state.clone());

    let bind = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;

    tracing::info!("🚀 Wayfarer listening on http://{}", bind);
    tracing::info!("📱 Web interface: http://{}", bind);
    tracing::info!("🔧 Health check: http://{}/health", bind);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(crate::shutdown::shutdown_signal())
    .await?;

    crate::shutdown::shutdown_with_timeout(&state, background).await;

    tracing::info!("Server shutdown complete");
    Ok(())
}
