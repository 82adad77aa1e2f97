//! Turns a user message into a reply.
//!
//! The orchestrator validates the message, records it in the conversation
//! store, asks the language model for a completion with the available tools,
//! runs any requested tool calls through the [`RecoveryService`] and records
//! the reply.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use wayfarer_core::config::defaults;
use wayfarer_core::{
    ChatMessage, CompletionRequest, DynLlmClient, MessageRole, Platform, TokenUsage, ToolCall,
    ToolError,
};
use wayfarer_tools::ToolRegistry;

use crate::conversation::ConversationStore;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::prompts::{EMPTY_REPLY, TELEGRAM_SYSTEM_PROMPT, WEB_SYSTEM_PROMPT};
use crate::resilience::RecoveryService;
use crate::validation::{sanitize_text, validate_message_with, ValidationError};

/// Placeholder for a tool call naming a tool that does not exist.
pub const UNKNOWN_FUNCTION: &str = "Unknown function";

/// Where a message came from. Decides prompt, context size and reply length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Web,
    Telegram,
}

impl Surface {
    pub fn platform(self) -> Platform {
        match self {
            Self::Web => Platform::Web,
            Self::Telegram => Platform::Telegram,
        }
    }

    /// Trailing messages sent to the model, including the new one.
    pub fn history_limit(self) -> usize {
        match self {
            Self::Web => defaults::WEB_HISTORY,
            Self::Telegram => defaults::TELEGRAM_HISTORY,
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Web => WEB_SYSTEM_PROMPT,
            Self::Telegram => TELEGRAM_SYSTEM_PROMPT,
        }
    }

    pub fn max_tokens(self, configured: u32) -> u32 {
        match self {
            Self::Web => configured,
            Self::Telegram => configured.min(defaults::TELEGRAM_MAX_TOKENS),
        }
    }
}

/// Orchestrator limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub max_tokens: u32,
    pub max_message_length: usize,
    /// Telegram replies longer than this are cut.
    pub max_response_length: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tokens: defaults::MAX_TOKENS,
            max_message_length: defaults::MAX_MESSAGE_LENGTH,
            max_response_length: defaults::MAX_RESPONSE_LENGTH,
        }
    }
}

/// The answer to one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub usage: Option<TokenUsage>,
    /// Names of the tools the model invoked, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<String>,
}

pub struct ResponseOrchestrator {
    llm: DynLlmClient,
    tools: Arc<ToolRegistry>,
    conversations: Arc<ConversationStore>,
    recovery: Arc<RecoveryService>,
    metrics: Arc<MetricsCollector>,
    config: OrchestratorConfig,
}

impl ResponseOrchestrator {
    pub fn new(llm: DynLlmClient, tools: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            tools,
            conversations: Arc::new(ConversationStore::new()),
            recovery: Arc::new(RecoveryService::new()),
            metrics: Arc::new(MetricsCollector::new()),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_conversations(mut self, conversations: Arc<ConversationStore>) -> Self {
        self.conversations = conversations;
        self
    }

    pub fn with_recovery(mut self, recovery: Arc<RecoveryService>) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub fn recovery(&self) -> &Arc<RecoveryService> {
        &self.recovery
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Answer `raw` from `user_id` on `surface`.
    ///
    /// Fails only on invalid input or a failed completion. Tool failures are
    /// folded into the reply text.
    pub async fn handle_message(
        &self,
        surface: Surface,
        user_id: &str,
        raw: &str,
    ) -> Result<ChatReply> {
        let started = Instant::now();
        let platform = surface.platform();
        self.metrics.record_message(platform).await;

        let text = sanitize_text(validate_message_with(raw, self.config.max_message_length)?);
        if text.is_empty() {
            return Err(ValidationError::Empty.into());
        }

        self.conversations
            .add_message(platform, user_id, MessageRole::User, text)
            .await;
        self.metrics
            .set_active_conversations(self.conversations.len().await)
            .await;

        let history = self
            .conversations
            .history(platform, user_id, surface.history_limit())
            .await;
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(surface.system_prompt()));
        messages.extend(history);

        let tools = self.tools.available_definitions();
        let tool_count = tools.len();
        let request = CompletionRequest::new(messages)
            .with_tools(tools)
            .with_max_tokens(surface.max_tokens(self.config.max_tokens));

        let completion = match self.llm.complete(request).await {
            Ok(completion) => completion,
            Err(err) => {
                error!(
                    category = "orchestrator",
                    platform = %platform,
                    model = self.llm.model_name(),
                    error = %err,
                    "Completion failed"
                );
                return Err(err.into());
            }
        };

        let mut tool_calls = Vec::new();
        let response = if completion.has_tool_calls() {
            tool_calls = completion.tool_calls.iter().map(|c| c.name.clone()).collect();
            let results = join_all(completion.tool_calls.iter().map(|c| self.run_tool_call(c))).await;
            results.join("\n\n")
        } else {
            completion
                .content
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| EMPTY_REPLY.to_string())
        };
        let response = self.fit_to_surface(surface, response);

        self.conversations
            .add_message(platform, user_id, MessageRole::Assistant, response.clone())
            .await;

        info!(
            category = "orchestrator",
            platform = %platform,
            tools_offered = tool_count,
            tools_called = tool_calls.len(),
            response_len = response.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Response generated"
        );

        Ok(ChatReply {
            response,
            usage: completion.usage,
            tool_calls,
        })
    }

    /// Run one tool call. Always yields display text.
    async fn run_tool_call(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.get(&call.name).cloned() else {
            warn!(category = "orchestrator", tool = %call.name, "Model requested unknown tool");
            return UNKNOWN_FUNCTION.to_string();
        };

        let args = match parse_arguments(&call.arguments) {
            Ok(args) => args,
            Err(err) => return format!("Error: {}", err),
        };
        if let Err(err) = tool.validate_args(&args) {
            return format!("Error: {}", err);
        }

        let started = Instant::now();
        let outcome = self
            .recovery
            .execute_with_retry(tool.service_key(), || {
                let tool = Arc::clone(&tool);
                let args = args.clone();
                async move { tool.execute(args).await }
            })
            .await;
        self.metrics
            .record_tool(&call.name, started.elapsed(), outcome.is_success())
            .await;

        outcome.into_output()
    }

    fn fit_to_surface(&self, surface: Surface, response: String) -> String {
        let max = self.config.max_response_length;
        if surface != Surface::Telegram || response.chars().count() <= max {
            return response;
        }
        let keep = max.saturating_sub(100);
        let mut cut: String = response.chars().take(keep).collect();
        cut.push_str("...");
        cut
    }

    /// Drop a user's history.
    pub async fn clear_conversation(&self, platform: Platform, user_id: &str) {
        let removed = self.conversations.clear(platform, user_id).await;
        if removed > 0 {
            self.metrics.record_conversation(removed).await;
        }
        self.metrics
            .set_active_conversations(self.conversations.len().await)
            .await;
    }
}

/// Models sometimes send an empty string for tools without arguments.
fn parse_arguments(raw: &str) -> std::result::Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use wayfarer_core::{Completion, LlmClient, LlmError};
    use wayfarer_tools::{FlightSearchTool, ToolRegistryBuilder, WeatherTool};

    use crate::error::AgentError;
    use crate::resilience::BackoffPolicy;

    /// Replays queued completions and keeps the requests it saw.
    #[derive(Default)]
    struct ScriptedLlm {
        replies: Mutex<VecDeque<std::result::Result<Completion, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        fn with(replies: Vec<std::result::Result<Completion, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            })
        }

        fn last_request(&self) -> CompletionRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<Completion, LlmError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Completion::text("ok")))
        }
    }

    fn orchestrator(llm: Arc<ScriptedLlm>) -> ResponseOrchestrator {
        let tools = ToolRegistryBuilder::new()
            .with_tool(Arc::new(WeatherTool::new(None)))
            .with_tool(Arc::new(FlightSearchTool::with_rng(StdRng::seed_from_u64(1))))
            .build();
        ResponseOrchestrator::new(llm, Arc::new(tools)).with_recovery(Arc::new(
            RecoveryService::new().with_backoff(BackoffPolicy::none()),
        ))
    }

    #[tokio::test]
    async fn test_plain_reply_is_recorded() {
        let llm = ScriptedLlm::with(vec![Ok(Completion::text("Hi! Where to?"))]);
        let orch = orchestrator(llm.clone());

        let reply = orch
            .handle_message(Surface::Web, "10.0.0.1", "  <script>x()</script>hello ")
            .await
            .unwrap();
        assert_eq!(reply.response, "Hi! Where to?");
        assert!(reply.tool_calls.is_empty());

        let history = orch.conversations().history(Platform::Web, "10.0.0.1", 10).await;
        assert_eq!(
            history,
            vec![ChatMessage::user("hello"), ChatMessage::assistant("Hi! Where to?")]
        );

        let request = llm.last_request();
        assert_eq!(request.messages[0], ChatMessage::system(WEB_SYSTEM_PROMPT));
        assert_eq!(request.messages.last(), Some(&ChatMessage::user("hello")));
        assert_eq!(request.max_tokens, Some(1000));
        // Weather has no key, so only flights is offered.
        let offered: Vec<_> = request.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(offered, ["search_flights"]);
    }

    #[tokio::test]
    async fn test_history_window_per_surface() {
        let llm = ScriptedLlm::with(vec![]);
        let orch = orchestrator(llm.clone());
        for i in 0..6 {
            orch.handle_message(Surface::Telegram, "99", &format!("q{}", i))
                .await
                .unwrap();
        }
        let request = llm.last_request();
        // System prompt plus the last four stored messages.
        assert_eq!(request.messages.len(), 5);
        assert_eq!(request.messages[0].content, TELEGRAM_SYSTEM_PROMPT);
        assert_eq!(request.max_tokens, Some(500));
        assert_eq!(request.messages[4], ChatMessage::user("q5"));
    }

    #[tokio::test]
    async fn test_tool_results_are_joined() {
        let llm = ScriptedLlm::with(vec![Ok(Completion::tool_calls(vec![
            ToolCall::new(
                "search_flights",
                r#"{"origin":"JFK","destination":"LHR","departure_date":"2025-03-01"}"#,
            ),
            ToolCall::new("book_spaceship", "{}"),
            ToolCall::new("get_current_weather", r#"{"location":"Paris"}"#),
            ToolCall::new("search_flights", "{not json"),
        ]))]);
        let orch = orchestrator(llm);

        let reply = orch
            .handle_message(Surface::Web, "u", "plan my trip")
            .await
            .unwrap();

        assert_eq!(
            reply.tool_calls,
            ["search_flights", "book_spaceship", "get_current_weather", "search_flights"]
        );
        assert!(reply.response.starts_with("✈️ **Flight Search Results**"));
        assert!(reply.response.contains("\n\nUnknown function\n\n🌤️ **Weather Service Temporarily Unavailable**"));
        assert!(reply.response.contains("due to: Weather service not available"));
        assert!(reply.response.ends_with(&format!(
            "\n\nError: {}",
            serde_json::from_str::<Value>("{not json").map(|_| ()).map_err(ToolError::from).unwrap_err()
        )));

        let snap = orch.metrics().snapshot().await;
        assert_eq!(snap.tools.total, 2);
        assert_eq!(snap.tools.successful, 1);
    }

    #[tokio::test]
    async fn test_missing_required_argument_reported_inline() {
        let llm = ScriptedLlm::with(vec![Ok(Completion::tool_calls(vec![ToolCall::new(
            "search_flights",
            r#"{"origin":"JFK"}"#,
        )]))]);
        let orch = orchestrator(llm);
        let reply = orch.handle_message(Surface::Web, "u", "fly").await.unwrap();
        assert!(reply.response.starts_with("Error: Invalid arguments: "));
        assert_eq!(orch.recovery().error_count("flights").await, 0);
    }

    #[tokio::test]
    async fn test_validation_error() {
        let orch = orchestrator(ScriptedLlm::with(vec![]));
        let err = orch.handle_message(Surface::Web, "u", "   ").await.unwrap_err();
        assert!(err.is_validation());

        let err = orch
            .handle_message(Surface::Web, "u", "<script>only()</script>")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(orch.conversations().is_empty().await);
    }

    #[tokio::test]
    async fn test_llm_error_is_surfaced() {
        let orch = orchestrator(ScriptedLlm::with(vec![Err(LlmError::RateLimited)]));
        let err = orch.handle_message(Surface::Web, "u", "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(LlmError::RateLimited)));
    }

    #[tokio::test]
    async fn test_telegram_replies_are_truncated() {
        let long = "a".repeat(4500);
        let orch = orchestrator(ScriptedLlm::with(vec![
            Ok(Completion::text(long.clone())),
            Ok(Completion::text(long)),
        ]));

        let tg = orch.handle_message(Surface::Telegram, "1", "hi").await.unwrap();
        assert_eq!(tg.response.chars().count(), 3903);
        assert!(tg.response.ends_with("..."));

        let web = orch.handle_message(Surface::Web, "1", "hi").await.unwrap();
        assert_eq!(web.response.len(), 4500);
    }

    #[tokio::test]
    async fn test_clear_conversation() {
        let orch = orchestrator(ScriptedLlm::with(vec![]));
        orch.handle_message(Surface::Web, "u", "hello").await.unwrap();
        orch.clear_conversation(Platform::Web, "u").await;

        assert!(orch.conversations().get_conversation(Platform::Web, "u").await.is_empty());
        let snap = orch.metrics().snapshot().await;
        assert_eq!(snap.conversations.total, 1);
        assert_eq!(snap.conversations.avg_messages_per_conversation, 2.0);
        assert_eq!(snap.conversations.active, 0);
    }
}
