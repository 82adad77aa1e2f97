//! Unified error handling for Wayfarer.
//!
//! This module provides a common error type that can be used across all crates,
//! so the surfaces only need one mapping from failures to user-visible output.
//! Tool failures are not part of it: they degrade into fallback text inside
//! the agent and never reach a surface.

use crate::llm::LlmError;

/// Unified error type for Wayfarer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound input was rejected before any processing.
    #[error("Invalid message: {0}")]
    Validation(String),

    /// Language-model failures, kept structured so callers can map the kind.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error was caused by the caller's input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("missing key");
        assert_eq!(err.to_string(), "Configuration error: missing key");

        let err = Error::validation("\"message\" is required");
        assert_eq!(err.to_string(), "Invalid message: \"message\" is required");
        assert!(err.is_validation());
    }

    #[test]
    fn test_llm_error_is_transparent() {
        let err: Error = LlmError::RateLimited.into();
        assert_eq!(
            err.to_string(),
            "OpenAI API rate limit exceeded. Please try again later."
        );
        assert!(!err.is_validation());
    }
}
