//! Unified error handling for the API.

use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use wayfarer_agent::AgentError;
use wayfarer_core::LlmError;

/// API error response with an HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip)]
    pub status: StatusCode,
    /// Set on internal errors so the log line can be found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Bad request (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message, StatusCode::BAD_REQUEST)
    }

    /// Unauthorized (401).
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message, StatusCode::UNAUTHORIZED)
    }

    /// Not found (404).
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("{} not found", resource.into()),
            StatusCode::NOT_FOUND,
        )
    }

    /// Unparseable request body (422).
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            "VALIDATION_ERROR",
            message,
            StatusCode::UNPROCESSABLE_ENTITY,
        )
    }

    /// Too many requests (429).
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMITED", message, StatusCode::TOO_MANY_REQUESTS)
    }

    /// Internal server error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Service unavailable (503).
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            "SERVICE_UNAVAILABLE",
            message,
            StatusCode::SERVICE_UNAVAILABLE,
        )
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": self.code,
                "message": self.message,
                "request_id": self.request_id,
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorResponse {}

impl From<AgentError> for ErrorResponse {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::Validation(message) => {
                Self::new("INVALID_MESSAGE", message, StatusCode::BAD_REQUEST)
            }
            AgentError::Llm(llm) => llm.into(),
            other => {
                let request_id = uuid::Uuid::new_v4().to_string();
                tracing::error!(
                    category = "http",
                    request_id = %request_id,
                    error = %other,
                    "Unhandled error"
                );
                Self::internal("Failed to process your request").with_request_id(request_id)
            }
        }
    }
}

impl From<LlmError> for ErrorResponse {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::InvalidCredentials => Self::unauthorized(e.to_string()),
            LlmError::RateLimited => Self::rate_limited(e.to_string()),
            LlmError::UpstreamUnavailable => Self::service_unavailable(e.to_string()),
            // Transport details stay in the logs
            _ => Self::internal(LlmError::Failed.to_string()),
        }
    }
}

impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ErrorResponse>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_mapping() {
        let cases = [
            (AgentError::validation("\"message\" is required"), StatusCode::BAD_REQUEST),
            (LlmError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
            (LlmError::RateLimited.into(), StatusCode::TOO_MANY_REQUESTS),
            (LlmError::UpstreamUnavailable.into(), StatusCode::SERVICE_UNAVAILABLE),
            (LlmError::Timeout(60).into(), StatusCode::INTERNAL_SERVER_ERROR),
            (AgentError::config("no state"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            let response = ErrorResponse::from(err);
            assert_eq!(response.status, status, "{response}");
        }
    }

    #[test]
    fn test_llm_failure_hides_transport_detail() {
        let response = ErrorResponse::from(AgentError::from(LlmError::Network(
            "connection reset".into(),
        )));
        assert_eq!(response.message, "Failed to generate AI response");
    }

    #[test]
    fn test_internal_errors_carry_request_id() {
        let response = ErrorResponse::from(AgentError::config("web root missing"));
        assert!(response.request_id.is_some());
        assert_eq!(response.message, "Failed to process your request");
    }

    #[test]
    fn test_display() {
        let err = ErrorResponse::not_found("Route");
        assert_eq!(err.to_string(), "[NOT_FOUND] Route not found");
    }
}
