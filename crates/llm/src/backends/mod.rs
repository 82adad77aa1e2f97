//! LLM backend implementations.
//!
//! This module provides concrete implementations of the `LlmClient` trait.

// OpenAI-compatible cloud backends
#[cfg(feature = "cloud")]
pub mod openai;
#[cfg(feature = "cloud")]
pub use openai::{OpenAiClient, OpenAiConfig};
