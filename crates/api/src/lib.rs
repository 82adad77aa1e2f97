//! HTTP and Telegram surfaces for the Wayfarer travel assistant.
//!
//! - `GET /health`
//! - `POST /api/chat`, `POST /api/clear`, `GET /api/stats`
//! - static web client from `web/`
//! - Telegram long-polling bot when a token is configured

pub mod config;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod server;
pub mod shutdown;
pub mod telegram;

pub use config::{AppConfig, Environment};
pub use rate_limit::{cleanup_task, extract_client_id, RateLimitConfig, RateLimitExceeded, RateLimiter};
pub use server::{create_router_with_state, run, RunOptions, ServerState};
pub use telegram::TelegramBot;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
