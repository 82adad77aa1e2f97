//! OpenAI-compatible chat completion backend with function calling.
//!
//! Works against api.openai.com and any endpoint that speaks the same
//! `/chat/completions` dialect (set `OPENAI_ENDPOINT`).

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wayfarer_core::config::{defaults, endpoints, env_string, env_or, env_vars, models};
use wayfarer_core::llm::{Completion, CompletionRequest, LlmClient, LlmError, TokenUsage, ToolCall};
use wayfarer_core::message::ChatMessage;
use wayfarer_core::tools::ToolDefinition;

/// Configuration for the OpenAI backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL, including the `/v1` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    endpoints::OPENAI.to_string()
}

fn default_model() -> String {
    models::OPENAI_DEFAULT.to_string()
}

fn default_temperature() -> f32 {
    defaults::TEMPERATURE
}

fn default_max_tokens() -> u32 {
    defaults::MAX_TOKENS
}

fn default_timeout_secs() -> u64 {
    defaults::LLM_TIMEOUT_SECS
}

impl OpenAiConfig {
    /// Create a config for api.openai.com.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Build a config from environment variables.
    ///
    /// Returns `None` when `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Option<Self> {
        let api_key = env_string(env_vars::OPENAI_API_KEY)?;
        let mut config = Self::new(api_key);
        if let Some(endpoint) = env_string(env_vars::OPENAI_ENDPOINT) {
            config.base_url = wayfarer_core::config::normalize_openai_endpoint(endpoint);
        }
        if let Some(model) = env_string(env_vars::LLM_MODEL) {
            config.model = model;
        }
        config.max_tokens = env_or(env_vars::LLM_MAX_TOKENS, config.max_tokens);
        config.temperature = env_or(env_vars::LLM_TEMPERATURE, config.temperature);
        Some(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Get the timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Chat completion client.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new client.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn build_request(&self, request: CompletionRequest) -> ChatCompletionRequest {
        let tools: Vec<ApiTool> = request.tools.into_iter().map(ApiTool::from).collect();
        let tool_choice = (!tools.is_empty()).then(|| "auto".to_string());

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(ApiMessage::from).collect(),
            max_tokens: Some(request.max_tokens.unwrap_or(self.config.max_tokens)),
            temperature: Some(request.temperature.unwrap_or(self.config.temperature)),
            tools,
            tool_choice,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let start_time = Instant::now();
        let body = self.build_request(request);

        debug!(
            category = "llm",
            model = %body.model,
            message_count = body.messages.len(),
            tools_count = body.tools.len(),
            "Making chat completion request"
        );

        let response = self
            .client
            .post(self.config.chat_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout_secs)
                } else {
                    LlmError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(
                category = "llm",
                status = status.as_u16(),
                body = %truncate_for_log(&text),
                "Chat completion failed"
            );
            return Err(LlmError::from_status(status.as_u16()));
        }

        let completion = parse_completion(&text)?;

        info!(
            category = "llm",
            tool_calls = completion.tool_calls.len(),
            total_tokens = completion.usage.map_or(0, |u| u.total_tokens),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Chat completion generated"
        );

        Ok(completion)
    }
}

/// Parse a `/chat/completions` response body.
fn parse_completion(body: &str) -> Result<Completion, LlmError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Serialization(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Serialization("No choices in response".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall::new(call.function.name, call.function.arguments).with_id(call.id))
        .collect();

    Ok(Completion {
        content: choice.message.content,
        tool_calls,
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    })
}

fn truncate_for_log(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

// API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for ApiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl From<ToolDefinition> for ApiTool {
    fn from(def: ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: ApiFunction {
                name: def.name,
                description: def.description,
                parameters: def.parameters,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ApiMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ApiMessageResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    function: ApiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::new("sk-test");
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.chat_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_config_with_model() {
        let config = OpenAiConfig::new("sk-test")
            .with_model("gpt-4o-mini")
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.chat_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_request_offers_tools_with_auto_choice() {
        let client = OpenAiClient::new(OpenAiConfig::new("sk-test")).unwrap();
        let request = CompletionRequest::new(vec![ChatMessage::user("weather in Paris?")])
            .with_tools(vec![ToolDefinition {
                name: "get_current_weather".to_string(),
                description: "Get weather".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            }])
            .with_max_tokens(500);

        let body = serde_json::to_value(client.build_request(request)).unwrap();
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_current_weather");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_request_without_tools_omits_tool_fields() {
        let client = OpenAiClient::new(OpenAiConfig::new("sk-test")).unwrap();
        let body = serde_json::to_value(
            client.build_request(CompletionRequest::new(vec![ChatMessage::user("hi")])),
        )
        .unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_parse_text_completion() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Bonjour!" }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13 }
        });
        let completion = parse_completion(&body.to_string()).unwrap();
        assert_eq!(completion.content.as_deref(), Some("Bonjour!"));
        assert!(completion.tool_calls.is_empty());
        assert_eq!(completion.usage.unwrap().total_tokens, 13);
    }

    #[test]
    fn test_parse_tool_call_completion() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": { "name": "get_current_weather", "arguments": "{\"location\":\"Paris\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let completion = parse_completion(&body.to_string()).unwrap();
        assert!(completion.content.is_none());
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].id, "call_abc");
        assert_eq!(completion.tool_calls[0].arguments, "{\"location\":\"Paris\"}");
    }

    #[test]
    fn test_parse_empty_choices_is_error() {
        let err = parse_completion(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, LlmError::Serialization(_)));
    }
}
