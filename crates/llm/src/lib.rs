//! LLM runtime implementation.
//!
//! This crate provides chat-completion backends for the orchestrator:
//! - OpenAI and OpenAI-compatible endpoints - enabled with the `openai` feature (default)
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `cloud` | Cloud backend support (requires HTTP client) |
//! | `openai` | OpenAI API support |

pub mod backends;

#[cfg(feature = "cloud")]
pub use backends::openai::{OpenAiClient, OpenAiConfig};

pub use wayfarer_core::llm::{Completion, CompletionRequest, LlmClient, LlmError};
