//! Telegram bot adapter.
//!
//! Long-polls the Bot API for updates and answers text messages through the
//! orchestrator with the Telegram surface. Slash commands are handled here
//! without touching the model.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use wayfarer_agent::error::{is_credential_error, is_rate_limited};
use wayfarer_agent::{format_uptime, AgentError, ResponseOrchestrator, Surface};
use wayfarer_core::config::endpoints;
use wayfarer_core::Platform;

/// Seconds the Bot API holds a `getUpdates` call open.
const POLL_TIMEOUT_SECS: u64 = 30;
/// Pause after a failed poll.
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub const WELCOME_MESSAGE: &str = "🤖 Welcome to the AI Travel Agent!

I can help you with:
✈️ Travel planning and recommendations
🌐 Real-time web search for travel info
🌤️ Current weather for any destination
📍 Location-based services

Just send me a message to get started!";

pub const HELP_MESSAGE: &str = "🤖 AI Travel Agent Commands:

/start - Start the bot
/help - Show this help message
/clear - Clear conversation history
/stats - Show bot statistics

Just send me any message and I'll help you with travel-related questions!

Examples:
• \"What's the weather in Paris?\"
• \"Find flights to Tokyo\"
• \"Best restaurants in New York\"
• \"Plan a 3-day trip to Rome\"";

pub const CLEARED_MESSAGE: &str = "🧹 Conversation history cleared!";
pub const CREDENTIALS_ERROR: &str = "🔑 Service temporarily unavailable. Please try again later.";
pub const RATE_LIMIT_ERROR: &str = "⏱️ Please slow down! Try again in a moment.";
pub const GENERIC_ERROR: &str =
    "❌ Sorry, I encountered an error processing your request. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),
}

/// Bot API envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Serialize)]
struct SendChatAction<'a> {
    chat_id: i64,
    action: &'a str,
}

/// Bot commands the adapter answers itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Clear,
    Stats,
}

impl Command {
    /// Parse `/name` or `/name@BotName`, ignoring arguments.
    ///
    /// Returns `None` for anything that is not a slash command, and
    /// `Some(None)` for an unrecognized one.
    pub fn parse(text: &str) -> Option<Option<Self>> {
        let rest = text.trim().strip_prefix('/')?;
        let name = rest.split_whitespace().next().unwrap_or_default();
        let name = name.split('@').next().unwrap_or_default();
        Some(match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "clear" => Some(Self::Clear),
            "stats" => Some(Self::Stats),
            _ => None,
        })
    }
}

/// Map an orchestrator failure to the reply shown in the chat.
pub fn error_reply(err: &AgentError) -> &'static str {
    if is_credential_error(err) {
        CREDENTIALS_ERROR
    } else if is_rate_limited(err) {
        RATE_LIMIT_ERROR
    } else {
        GENERIC_ERROR
    }
}

pub struct TelegramBot {
    client: Client,
    /// `https://api.telegram.org/bot<token>`
    api_base: String,
    orchestrator: Arc<ResponseOrchestrator>,
}

impl TelegramBot {
    pub fn new(token: &str, orchestrator: Arc<ResponseOrchestrator>) -> Self {
        Self::with_api_base(format!("{}/bot{}", endpoints::TELEGRAM, token), orchestrator)
    }

    pub fn with_api_base(api_base: impl Into<String>, orchestrator: Arc<ResponseOrchestrator>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            orchestrator,
        }
    }

    /// Check the token, then poll until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.call::<_, User>("getMe", &serde_json::json!({})).await {
                Ok(me) => info!(
                    category = "telegram",
                    bot = me.username.as_deref().unwrap_or("unknown"),
                    "🤖 Telegram bot started successfully"
                ),
                Err(e) => {
                    error!(category = "telegram", error = %e, "Failed to start Telegram bot");
                    return;
                }
            }
            Arc::new(self).poll().await;
        })
    }

    async fn poll(self: Arc<Self>) {
        let mut offset = 0;
        loop {
            let request = GetUpdates {
                offset,
                timeout: POLL_TIMEOUT_SECS,
                allowed_updates: &["message"],
            };
            match self.call::<_, Vec<Update>>("getUpdates", &request).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(message) = update.message {
                            let bot = Arc::clone(&self);
                            tokio::spawn(async move { bot.handle_message(message).await });
                        }
                    }
                }
                Err(e) => {
                    warn!(category = "telegram", error = %e, "Polling failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn handle_message(&self, message: Message) {
        let chat_id = message.chat.id;
        let Some(text) = message.text.as_deref() else {
            return;
        };

        // Typing indicator only for messages that reach the model
        if Command::parse(text).is_none() {
            let action = SendChatAction {
                chat_id,
                action: "typing",
            };
            if let Err(e) = self.call::<_, bool>("sendChatAction", &action).await {
                debug!(category = "telegram", error = %e, "sendChatAction failed");
            }
        }

        let Some(reply) = self.respond(&message).await else {
            return;
        };

        let send = SendMessage {
            chat_id,
            text: &reply,
        };
        match self.call::<_, Message>("sendMessage", &send).await {
            Ok(_) => info!(
                category = "telegram",
                chat_id,
                response_length = reply.chars().count(),
                "Telegram response sent"
            ),
            Err(e) => error!(category = "telegram", chat_id, error = %e, "sendMessage failed"),
        }
    }

    /// The text to send back for `message`, if any.
    ///
    /// Unknown commands and non-text updates get no reply.
    pub async fn respond(&self, message: &Message) -> Option<String> {
        let text = message.text.as_deref()?;
        let user_id = message.chat.id.to_string();

        match Command::parse(text) {
            Some(Some(Command::Start)) => {
                info!(
                    category = "telegram",
                    user_id = message.from.as_ref().map(|u| u.id),
                    username = message.from.as_ref().and_then(|u| u.username.as_deref()),
                    "Telegram user started bot"
                );
                Some(WELCOME_MESSAGE.to_string())
            }
            Some(Some(Command::Help)) => Some(HELP_MESSAGE.to_string()),
            Some(Some(Command::Clear)) => {
                self.orchestrator
                    .clear_conversation(Platform::Telegram, &user_id)
                    .await;
                Some(CLEARED_MESSAGE.to_string())
            }
            Some(Some(Command::Stats)) => Some(self.stats_message().await),
            Some(None) => None,
            None => Some(self.answer(&user_id, text).await),
        }
    }

    async fn answer(&self, user_id: &str, text: &str) -> String {
        debug!(
            category = "telegram",
            user_id,
            message_length = text.chars().count(),
            "Processing Telegram message"
        );

        let started = Instant::now();
        let result = self
            .orchestrator
            .handle_message(Surface::Telegram, user_id, text)
            .await;
        self.orchestrator
            .metrics()
            .record_request("telegram", started.elapsed(), result.is_ok())
            .await;

        match result {
            Ok(reply) => reply.response,
            Err(e) => {
                let preview: String = text.chars().take(50).collect();
                error!(
                    category = "telegram",
                    user_id,
                    error = %e,
                    preview = %preview,
                    "Telegram message handling error"
                );
                error_reply(&e).to_string()
            }
        }
    }

    async fn stats_message(&self) -> String {
        let conversations = self.orchestrator.conversations().stats().await;
        let metrics = self.orchestrator.metrics().snapshot().await;

        format!(
            "📊 Bot Statistics:\n\n🗣️ Active conversations: {}\n📨 Requests handled: {}\n✅ Success rate: {}\n⏱️ Uptime: {}",
            conversations.total_conversations,
            metrics.requests.total,
            metrics.requests.success_rate,
            format_uptime(Duration::from_secs(conversations.uptime_secs)),
        )
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, TelegramError> {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api(
                response
                    .description
                    .unwrap_or_else(|| format!("{} returned no result", method)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::LlmError;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/start"), Some(Some(Command::Start)));
        assert_eq!(Command::parse("/help@WayfarerBot"), Some(Some(Command::Help)));
        assert_eq!(Command::parse("  /STATS now"), Some(Some(Command::Stats)));
        assert_eq!(Command::parse("/unknown"), Some(None));
        assert_eq!(Command::parse("weather in Oslo"), None);
    }

    #[test]
    fn test_error_reply() {
        assert_eq!(error_reply(&LlmError::InvalidCredentials.into()), CREDENTIALS_ERROR);
        assert_eq!(error_reply(&LlmError::RateLimited.into()), RATE_LIMIT_ERROR);
        assert_eq!(error_reply(&LlmError::UpstreamUnavailable.into()), GENERIC_ERROR);
        assert_eq!(error_reply(&AgentError::validation("empty")), GENERIC_ERROR);
    }

    #[test]
    fn test_update_deserialize() {
        let raw = r#"{
            "update_id": 42,
            "message": {
                "message_id": 7,
                "chat": {"id": 5551234, "type": "private"},
                "from": {"id": 5551234, "is_bot": false, "first_name": "Ana", "username": "ana"},
                "date": 1700000000,
                "text": "/start"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 5551234);
        assert_eq!(message.text.as_deref(), Some("/start"));
    }
}
