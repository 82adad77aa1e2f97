//! Web chat handlers.
//!
//! Web users are identified by client address (see `ServerState::client_id`),
//! so a browser keeps its history for as long as its IP does.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};

use wayfarer_agent::Surface;
use wayfarer_core::Platform;

use super::ServerState;
use crate::models::{ApiResult, ChatRequest, ChatResponse, ClearResponse, ErrorResponse};

/// `POST /api/chat`
pub async fn chat_handler(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload?;
    let user_id = state.client_id(&headers, connect_info.as_ref());

    let reply = state
        .orchestrator
        .handle_message(Surface::Web, &user_id, &request.message)
        .await
        .map_err(|e| {
            if e.is_validation() {
                tracing::debug!(category = "chat", error = %e, "Rejected web message");
            } else {
                tracing::error!(category = "chat", error = %e, "Web chat error");
            }
            ErrorResponse::from(e)
        })?;

    Ok(Json(ChatResponse {
        response: reply.response,
        usage: reply.usage,
    }))
}

/// `POST /api/clear`
pub async fn clear_handler(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Json<ClearResponse> {
    let user_id = state.client_id(&headers, connect_info.as_ref());
    state
        .orchestrator
        .clear_conversation(Platform::Web, &user_id)
        .await;

    Json(ClearResponse {
        success: true,
        message: "Conversation cleared",
    })
}
