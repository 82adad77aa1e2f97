//! Core tool abstractions for Wayfarer.
//!
//! This module defines the foundational traits for function calling
//! used by the response orchestrator.
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Tool error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// Invalid arguments provided.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Required credentials or configuration are missing.
    #[error("{0}")]
    Unavailable(String),

    /// The upstream API answered with a non-success status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Transport failure before a status was received.
    #[error("Network error: {0}")]
    Network(String),

    /// The outbound call exceeded its timeout.
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Tool execution failed.
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    /// Create an upstream error for a status code.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Whether repeating the same call could plausibly succeed.
    ///
    /// Bad arguments, missing keys and rejected credentials fail the same way
    /// every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidArguments(_) | Self::NotFound(_) | Self::Unavailable(_) => false,
            Self::Upstream { status, .. } => *status != 401 && *status != 404,
            Self::Network(_) | Self::Timeout(_) | Self::Execution(_) => true,
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

/// Tool definition for LLM consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON schema for parameters.
    pub parameters: Value,
}

/// Core tool trait.
///
/// Every tool returns display text: the result is placed verbatim in the
/// chat transcript.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Get the tool description.
    fn description(&self) -> &str;

    /// Get the parameter schema (JSON Schema).
    fn parameters(&self) -> Value;

    /// Key shared with the circuit breaker and fallback templates.
    fn service_key(&self) -> &str;

    /// Whether the credentials/config this tool needs are present.
    fn is_available(&self) -> bool {
        true
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> Result<String>;

    /// Get the tool definition for LLM consumption.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    /// Validate arguments against the `required` list of the schema.
    fn validate_args(&self, args: &Value) -> Result<()> {
        let params = self.parameters();
        let Some(required) = params.get("required").and_then(|r| r.as_array()) else {
            return Ok(());
        };
        let args_obj = args
            .as_object()
            .ok_or_else(|| ToolError::InvalidArguments("Expected object".to_string()))?;

        for req in required.iter().filter_map(|r| r.as_str()) {
            match args_obj.get(req) {
                None | Some(Value::Null) => {
                    return Err(ToolError::InvalidArguments(format!(
                        "Missing required parameter: {}",
                        req
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Shared handle to a tool.
pub type DynTool = Arc<dyn Tool>;

/// Helper function to create an object schema.
pub fn object_schema(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Helper function to create a simple property definition.
pub fn property(prop_type: &str, description: &str) -> Value {
    serde_json::json!({
        "type": prop_type,
        "description": description
    })
}

/// Helper function to create a string property.
pub fn string_property(description: &str) -> Value {
    property("string", description)
}

/// Helper function to create a number property.
pub fn number_property(description: &str) -> Value {
    property("number", description)
}

/// Helper function to create an integer property with a default.
pub fn integer_property(description: &str, default: i64) -> Value {
    serde_json::json!({
        "type": "integer",
        "description": description,
        "default": default
    })
}

/// Helper function to create a string enum property.
pub fn enum_property(description: &str, values: &[&str]) -> Value {
    serde_json::json!({
        "type": "string",
        "description": description,
        "enum": values
    })
}

/// Read a required string argument.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing required parameter: {}", key)))
}

/// Read an optional string argument, treating blanks as absent.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
