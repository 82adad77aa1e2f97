//! Shared HTTP plumbing for the lookup tools.
//!
//! Each tool does a single GET with its own timeout and turns upstream status
//! codes into its own wording; the mapping lives here.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::warn;

use wayfarer_core::tools::{Result, ToolError};

/// Per-tool wording for upstream failures.
#[derive(Debug, Clone)]
pub struct StatusMessages {
    pub unauthorized: String,
    /// Used for 404; falls back to `unavailable` when `None`.
    pub not_found: Option<String>,
    pub rate_limited: String,
    pub unavailable: String,
}

impl StatusMessages {
    /// Message for a non-success status.
    pub fn for_status(&self, status: u16) -> String {
        match status {
            401 => self.unauthorized.clone(),
            404 => self
                .not_found
                .clone()
                .unwrap_or_else(|| self.unavailable.clone()),
            429 => self.rate_limited.clone(),
            _ => self.unavailable.clone(),
        }
    }
}

/// Thin JSON GET client bound to one timeout.
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: Client,
    timeout_secs: u64,
}

impl JsonClient {
    pub fn new(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(category = "tools", error = %e, "Falling back to default HTTP client");
                Client::new()
            });
        Self {
            client,
            timeout_secs,
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// GET `url` with `query` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        messages: &StatusMessages,
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e, messages))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::upstream(
                status.as_u16(),
                messages.for_status(status.as_u16()),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ToolError::Execution(format!("{}: {}", messages.unavailable, e)))
    }

    fn transport_error(&self, err: reqwest::Error, messages: &StatusMessages) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout(self.timeout_secs)
        } else {
            ToolError::Network(format!("{} ({})", messages.unavailable, err))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn messages() -> StatusMessages {
        StatusMessages {
            unauthorized: "Invalid key".to_string(),
            not_found: Some("Nothing here".to_string()),
            rate_limited: "Slow down".to_string(),
            unavailable: "Down".to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        let m = messages();
        assert_eq!(m.for_status(401), "Invalid key");
        assert_eq!(m.for_status(404), "Nothing here");
        assert_eq!(m.for_status(429), "Slow down");
        assert_eq!(m.for_status(502), "Down");

        let without_404 = StatusMessages {
            not_found: None,
            ..messages()
        };
        assert_eq!(without_404.for_status(404), "Down");
    }

    #[tokio::test]
    async fn test_get_json_maps_status() {
        let base = test_server::serve(429, "{}").await;
        let client = JsonClient::new(5);
        let err = client
            .get_json::<serde_json::Value>(&base, &[], &messages())
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::upstream(429, "Slow down"));
    }

    #[tokio::test]
    async fn test_get_json_decodes_body() {
        let base = test_server::serve(200, r#"{"ok":true}"#).await;
        let client = JsonClient::new(5);
        let value: serde_json::Value = client
            .get_json(&format!("{}/anything", base), &[("q", "x")], &messages())
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
    }
}
