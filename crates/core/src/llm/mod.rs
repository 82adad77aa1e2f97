//! Language-model abstraction.
//!
//! The orchestrator only needs one operation from a model backend: a chat
//! completion over a message list that may come back either as text or as a
//! set of tool-call requests. Backends implement [`LlmClient`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;
use crate::tools::ToolDefinition;

/// Failure kinds a model backend can report.
///
/// The first four variants are the ones surfaced to users; the remaining ones
/// describe transport problems and collapse to [`LlmError::Failed`] semantics
/// at the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("Invalid OpenAI API key")]
    InvalidCredentials,

    #[error("OpenAI API rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("OpenAI service temporarily unavailable")]
    UpstreamUnavailable,

    #[error("Failed to generate AI response")]
    Failed,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed response: {0}")]
    Serialization(String),
}

impl LlmError {
    /// Map an upstream HTTP status to the user-facing error kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::InvalidCredentials,
            429 => Self::RateLimited,
            500..=599 => Self::UpstreamUnavailable,
            _ => Self::Failed,
        }
    }
}

/// Token accounting returned by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A structured request from the model to invoke a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments exactly as the model produced them.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Input for a single completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Tools offered to the model; empty disables function calling.
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Result of a completion.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    /// A plain text answer.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// An answer that only requests tool invocations.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Default::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier used for requests.
    fn model_name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;
}

/// Shared handle to a backend.
pub type DynLlmClient = Arc<dyn LlmClient>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(LlmError::from_status(401), LlmError::InvalidCredentials);
        assert_eq!(LlmError::from_status(429), LlmError::RateLimited);
        assert_eq!(LlmError::from_status(500), LlmError::UpstreamUnavailable);
        assert_eq!(LlmError::from_status(503), LlmError::UpstreamUnavailable);
        assert_eq!(LlmError::from_status(400), LlmError::Failed);
    }

    #[test]
    fn test_completion_builders() {
        let completion = Completion::tool_calls(vec![
            ToolCall::new("get_current_weather", r#"{"location":"Paris"}"#).with_id("call_1"),
        ]);
        assert!(completion.has_tool_calls());
        assert!(completion.content.is_none());
        assert_eq!(completion.tool_calls[0].id, "call_1");

        assert!(!Completion::text("hello").has_tool_calls());
    }
}
