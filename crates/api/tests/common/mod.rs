//! Common test utilities for API tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use wayfarer_agent::{BackoffPolicy, RecoveryService, ResponseOrchestrator};
use wayfarer_api::{create_router_with_state, RateLimitConfig, ServerState};
use wayfarer_core::{Completion, CompletionRequest, LlmClient, LlmError, ToolCall};
use wayfarer_tools::{HotelSearchTool, ToolRegistryBuilder, WeatherTool, WebSearchTool};

/// LLM double answering from a queue, then with a fixed greeting.
#[derive(Default)]
pub struct MockLlm {
    queue: Mutex<VecDeque<Result<Completion, LlmError>>>,
}

impl MockLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, reply: Result<Completion, LlmError>) {
        self.queue.lock().unwrap().push_back(reply);
    }

    pub fn push_tool_call(&self, name: &str, arguments: &str) {
        self.push(Ok(Completion::tool_calls(vec![
            ToolCall::new(name, arguments).with_id("call_1")
        ])));
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Completion::text("Happy to help with your trip!")))
    }
}

pub fn test_orchestrator(llm: Arc<MockLlm>) -> Arc<ResponseOrchestrator> {
    let tools = ToolRegistryBuilder::new()
        .with_tool(Arc::new(WebSearchTool::new(None)))
        .with_tool(Arc::new(WeatherTool::new(None)))
        .with_tool(Arc::new(HotelSearchTool::new()))
        .build();

    Arc::new(
        ResponseOrchestrator::new(llm, Arc::new(tools))
            .with_recovery(Arc::new(RecoveryService::new().with_backoff(BackoffPolicy::none()))),
    )
}

pub fn web_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../web")
}

/// Create a server state for testing, with the default budgets.
pub fn create_test_server_state(llm: Arc<MockLlm>) -> ServerState {
    ServerState::with_parts(
        test_orchestrator(llm),
        RateLimitConfig::chat(),
        RateLimitConfig::api(),
        web_root(),
    )
}

pub fn test_router(llm: Arc<MockLlm>) -> (Router, ServerState) {
    let state = create_test_server_state(llm);
    (create_router_with_state(state.clone()), state)
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", "198.51.100.20")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.20")
        .body(Body::empty())
        .unwrap()
}

/// Send a request and decode the body as JSON (`Null` when it is not JSON).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
