//! Core traits and types for the Wayfarer travel assistant.
//!
//! This crate defines the foundational abstractions shared by the LLM client,
//! the tool implementations, the agent layer and the HTTP/Telegram surfaces.

pub mod config;
pub mod error;
pub mod llm;
pub mod message;
pub mod tools;

pub use error::{Error, Result};
pub use llm::{Completion, CompletionRequest, DynLlmClient, LlmClient, LlmError, TokenUsage, ToolCall};
pub use message::{ChatMessage, MessageRole, Platform};
pub use tools::{DynTool, Tool, ToolDefinition, ToolError};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::config::{defaults, endpoints, env_vars};
    pub use crate::error::{Error, Result};
    pub use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError, ToolCall};
    pub use crate::message::{ChatMessage, MessageRole, Platform};
    pub use crate::tools::{Tool, ToolDefinition, ToolError};
}
