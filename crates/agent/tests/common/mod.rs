//! Shared helpers for agent integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use wayfarer_agent::{BackoffPolicy, RecoveryService, ResponseOrchestrator};
use wayfarer_core::{Completion, CompletionRequest, LlmClient, LlmError, ToolCall};
use wayfarer_tools::{
    CurrencyTool, FlightSearchTool, HotelSearchTool, ToolRegistryBuilder, WeatherTool,
};

/// LLM double that answers from a queue, then with a fixed text.
#[derive(Default)]
pub struct MockLlm {
    queue: Mutex<VecDeque<Result<Completion, LlmError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
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

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Completion::text("Happy to help with your trip!")))
    }
}

/// Orchestrator with keyless weather, offline currency and seeded mocks.
pub fn orchestrator(llm: Arc<MockLlm>) -> ResponseOrchestrator {
    let tools = ToolRegistryBuilder::new()
        .with_tool(Arc::new(WeatherTool::new(None)))
        .with_tool(Arc::new(CurrencyTool::new().with_base_url("http://127.0.0.1:9")))
        .with_tool(Arc::new(FlightSearchTool::with_rng(StdRng::seed_from_u64(7))))
        .with_tool(Arc::new(HotelSearchTool::with_rng(StdRng::seed_from_u64(7))))
        .build();

    ResponseOrchestrator::new(llm, Arc::new(tools)).with_recovery(Arc::new(
        RecoveryService::new().with_backoff(BackoffPolicy::none()),
    ))
}
