//! Telegram replies, without the Bot API round trip.

mod common;

use common::{test_orchestrator, MockLlm};
use wayfarer_api::telegram::{
    Chat, Message, TelegramBot, CLEARED_MESSAGE, CREDENTIALS_ERROR, HELP_MESSAGE,
    RATE_LIMIT_ERROR, WELCOME_MESSAGE,
};
use wayfarer_core::{LlmError, Platform};

const CHAT_ID: i64 = 5551234;

fn text(body: &str) -> Message {
    Message {
        message_id: 1,
        chat: Chat { id: CHAT_ID },
        from: None,
        text: Some(body.to_string()),
    }
}

fn bot(llm: std::sync::Arc<MockLlm>) -> TelegramBot {
    // Never contacted: `respond` does not call the Bot API
    TelegramBot::with_api_base("http://127.0.0.1:9/botTEST", test_orchestrator(llm))
}

#[tokio::test]
async fn test_commands() {
    let bot = bot(MockLlm::new());

    assert_eq!(bot.respond(&text("/start")).await.unwrap(), WELCOME_MESSAGE);
    assert_eq!(bot.respond(&text("/help")).await.unwrap(), HELP_MESSAGE);
    assert!(bot.respond(&text("/unknown")).await.is_none());

    let stats = bot.respond(&text("/stats")).await.unwrap();
    assert!(stats.starts_with("📊 Bot Statistics:"));
    assert!(stats.contains("Active conversations: 0"));
}

#[tokio::test]
async fn test_free_text_goes_through_orchestrator() {
    let llm = MockLlm::new();
    let orchestrator = test_orchestrator(llm.clone());
    let bot = TelegramBot::with_api_base("http://127.0.0.1:9/botTEST", orchestrator.clone());

    let reply = bot.respond(&text("Plan a weekend in Rome")).await.unwrap();
    assert_eq!(reply, "Happy to help with your trip!");

    let conversation = orchestrator
        .conversations()
        .get_conversation(Platform::Telegram, &CHAT_ID.to_string())
        .await;
    assert_eq!(conversation.len(), 2);

    assert_eq!(bot.respond(&text("/clear")).await.unwrap(), CLEARED_MESSAGE);
    let conversation = orchestrator
        .conversations()
        .get_conversation(Platform::Telegram, &CHAT_ID.to_string())
        .await;
    assert!(conversation.is_empty());
}

#[tokio::test]
async fn test_llm_errors_become_friendly_replies() {
    let llm = MockLlm::new();
    llm.push(Err(LlmError::InvalidCredentials));
    llm.push(Err(LlmError::RateLimited));
    let bot = bot(llm);

    assert_eq!(bot.respond(&text("hi")).await.unwrap(), CREDENTIALS_ERROR);
    assert_eq!(bot.respond(&text("hi again")).await.unwrap(), RATE_LIMIT_ERROR);
}

#[tokio::test]
async fn test_long_replies_are_truncated() {
    let llm = MockLlm::new();
    llm.push(Ok(wayfarer_core::Completion::text("x".repeat(5000))));
    let bot = bot(llm);

    let reply = bot.respond(&text("tell me everything")).await.unwrap();
    assert_eq!(reply.chars().count(), 3903);
    assert!(reply.ends_with("..."));
}
