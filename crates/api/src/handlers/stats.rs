//! Statistics API handler.

use axum::{extract::State, Json};

use super::ServerState;
use crate::models::{StatsResponse, ToolAvailability};

/// `GET /api/stats`
///
/// Conversation figures at the top level, then tool availability, breaker
/// state per service and the full metrics snapshot.
pub async fn stats_handler(State(state): State<ServerState>) -> Json<StatsResponse> {
    let orchestrator = &state.orchestrator;
    let conversations = orchestrator.conversations().stats().await;

    orchestrator
        .metrics()
        .set_active_conversations(conversations.total_conversations)
        .await;

    let tools = orchestrator
        .tools()
        .availability()
        .into_iter()
        .map(|(name, available)| ToolAvailability { name, available })
        .collect();

    Json(StatsResponse {
        conversations,
        tools,
        services: orchestrator.recovery().service_status().await,
        metrics: orchestrator.metrics().snapshot().await,
    })
}
