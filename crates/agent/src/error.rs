//! Error types for the agent crate.
//!
//! The orchestrator reports failures through the unified error type from
//! core: `Error::Validation` for rejected input and `Error::Llm` for
//! completion failures. Tool failures never surface here.

pub use wayfarer_core::error::Error as AgentError;
pub use wayfarer_core::error::Result;

use wayfarer_core::LlmError;

/// Whether the error came from the language model rejecting our credentials.
pub fn is_credential_error(err: &AgentError) -> bool {
    matches!(err, AgentError::Llm(LlmError::InvalidCredentials))
}

/// Whether the error came from upstream rate limiting.
pub fn is_rate_limited(err: &AgentError) -> bool {
    matches!(err, AgentError::Llm(LlmError::RateLimited))
}
