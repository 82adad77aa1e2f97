//! Request and response models for the web API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use wayfarer_agent::{ConversationStats, MetricsSnapshot, ServiceStatus};
use wayfarer_core::TokenUsage;

pub mod error;

pub use error::{ApiResult, ErrorResponse};

/// Chat request from the web client.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Missing is treated like empty and rejected by validation.
    #[serde(default)]
    pub message: String,
}

/// Chat response to the web client.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since start.
    pub uptime: u64,
    pub version: &'static str,
}

/// Which tools can run with the configured keys.
#[derive(Debug, Clone, Serialize)]
pub struct ToolAvailability {
    pub name: String,
    pub available: bool,
}

/// Body of `GET /api/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub conversations: ConversationStats,
    pub tools: Vec<ToolAvailability>,
    pub services: BTreeMap<String, ServiceStatus>,
    pub metrics: MetricsSnapshot,
}
