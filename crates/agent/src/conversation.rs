//! In-memory conversation history per platform and user.
//!
//! Each conversation keeps at most a fixed number of messages, dropping the
//! oldest first. Conversations idle for longer than a day are evicted by a
//! periodic sweep. Nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use wayfarer_core::config::{defaults, is_test_environment};
use wayfarer_core::{ChatMessage, MessageRole, Platform};

/// A message as stored, with the time it was added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One user's history on one platform.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub messages: Vec<StoredMessage>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Conversation {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Store-wide figures for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationStats {
    pub total_conversations: usize,
    pub total_messages: usize,
    /// Approximate bytes held in message content.
    pub memory_usage: usize,
    pub uptime_secs: u64,
}

/// Shared conversation store.
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
    max_messages: usize,
    max_idle: chrono::Duration,
    started: Instant,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_limits(
            defaults::MAX_CONVERSATION_MESSAGES,
            Duration::from_secs(defaults::CONVERSATION_MAX_IDLE_SECS),
        )
    }

    pub fn with_limits(max_messages: usize, max_idle: Duration) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            max_messages,
            max_idle: chrono::Duration::from_std(max_idle)
                .unwrap_or_else(|_| chrono::Duration::days(1)),
            started: Instant::now(),
        }
    }

    fn key(platform: Platform, user_id: &str) -> String {
        format!("{}:{}", platform, user_id)
    }

    /// Append a message and return the updated conversation.
    pub async fn add_message(
        &self,
        platform: Platform,
        user_id: &str,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Conversation {
        let now = Utc::now();
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .entry(Self::key(platform, user_id))
            .or_insert_with(|| Conversation::new(now));

        conversation.messages.push(StoredMessage {
            role,
            content: content.into(),
            timestamp: now,
        });
        if conversation.messages.len() > self.max_messages {
            let excess = conversation.messages.len() - self.max_messages;
            conversation.messages.drain(..excess);
        }
        conversation.last_activity = now;

        debug!(
            category = "conversation",
            platform = %platform,
            user = %redact(user_id),
            role = %role,
            message_count = conversation.messages.len(),
            "Message added to conversation"
        );
        conversation.clone()
    }

    /// The last `limit` messages, oldest first. Empty when there is no conversation.
    pub async fn history(&self, platform: Platform, user_id: &str, limit: usize) -> Vec<ChatMessage> {
        let conversations = self.conversations.read().await;
        let Some(conversation) = conversations.get(&Self::key(platform, user_id)) else {
            return Vec::new();
        };
        let skip = conversation.messages.len().saturating_sub(limit);
        conversation.messages[skip..]
            .iter()
            .map(|m| ChatMessage::new(m.role, m.content.clone()))
            .collect()
    }

    /// Snapshot of a conversation, or an empty one when missing.
    pub async fn get_conversation(&self, platform: Platform, user_id: &str) -> Conversation {
        self.conversations
            .read()
            .await
            .get(&Self::key(platform, user_id))
            .cloned()
            .unwrap_or_else(|| Conversation::new(Utc::now()))
    }

    /// Remove a conversation, returning how many messages it held.
    pub async fn clear(&self, platform: Platform, user_id: &str) -> usize {
        let removed = self
            .conversations
            .write()
            .await
            .remove(&Self::key(platform, user_id));
        info!(
            category = "conversation",
            platform = %platform,
            user = %redact(user_id),
            "Conversation cleared"
        );
        removed.map_or(0, |c| c.len())
    }

    /// Evict conversations idle for longer than the limit.
    pub async fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now()).await
    }

    pub async fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.max_idle;
        let mut conversations = self.conversations.write().await;
        let before = conversations.len();
        conversations.retain(|_, c| c.last_activity >= cutoff);
        let cleaned = before - conversations.len();

        if cleaned > 0 {
            info!(
                category = "conversation",
                cleaned,
                remaining = conversations.len(),
                "Cleaned up old conversations"
            );
        }
        cleaned
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }

    pub async fn stats(&self) -> ConversationStats {
        let conversations = self.conversations.read().await;
        let (total_messages, memory_usage) = conversations
            .values()
            .flat_map(|c| c.messages.iter())
            .fold((0, 0), |(n, bytes), m| (n + 1, bytes + m.content.len()));

        ConversationStats {
            total_conversations: conversations.len(),
            total_messages,
            memory_usage,
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Run [`ConversationStore::cleanup`] every `interval`.
///
/// Returns `None` in the test environment, where no sweeper is started.
pub fn spawn_cleanup(store: Arc<ConversationStore>, interval: Duration) -> Option<JoinHandle<()>> {
    if is_test_environment() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.cleanup().await;
        }
    }))
}

/// First eight characters of a user id, for logs.
fn redact(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(8).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_is_capped_fifo() {
        let store = ConversationStore::new();
        for i in 0..25 {
            store
                .add_message(Platform::Web, "1.2.3.4", MessageRole::User, format!("m{}", i))
                .await;
        }

        let conversation = store.get_conversation(Platform::Web, "1.2.3.4").await;
        assert_eq!(conversation.len(), 20);
        assert_eq!(conversation.messages[0].content, "m5");

        let history = store.history(Platform::Web, "1.2.3.4", 8).await;
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m17", "m18", "m19", "m20", "m21", "m22", "m23", "m24"]);

        assert_eq!(store.history(Platform::Web, "1.2.3.4", 100).await.len(), 20);
    }

    #[tokio::test]
    async fn test_platforms_are_isolated() {
        let store = ConversationStore::new();
        store.add_message(Platform::Web, "42", MessageRole::User, "web").await;
        store.add_message(Platform::Telegram, "42", MessageRole::User, "tg").await;

        let web = store.history(Platform::Web, "42", 10).await;
        assert_eq!(web, vec![ChatMessage::user("web")]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_missing_conversation_is_empty() {
        let store = ConversationStore::new();
        assert!(store.history(Platform::Web, "nobody", 8).await.is_empty());
        assert!(store.get_conversation(Platform::Web, "nobody").await.is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = ConversationStore::new();
        store.add_message(Platform::Telegram, "7", MessageRole::User, "hi").await;
        store.add_message(Platform::Telegram, "7", MessageRole::Assistant, "hello").await;

        assert_eq!(store.clear(Platform::Telegram, "7").await, 2);
        assert!(store.get_conversation(Platform::Telegram, "7").await.is_empty());
        assert_eq!(store.clear(Platform::Telegram, "7").await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_evicts_idle() {
        let store = ConversationStore::new();
        store.add_message(Platform::Web, "a", MessageRole::User, "hi").await;

        assert_eq!(store.cleanup_at(Utc::now() + chrono::Duration::hours(23)).await, 0);
        assert_eq!(store.cleanup_at(Utc::now() + chrono::Duration::hours(25)).await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = ConversationStore::new();
        store.add_message(Platform::Web, "a", MessageRole::User, "12345").await;
        store.add_message(Platform::Web, "b", MessageRole::User, "123").await;

        let stats = store.stats().await;
        assert_eq!(stats.total_conversations, 2);
        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.memory_usage, 8);
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("123456789012"), "12345678...");
        assert_eq!(redact("42"), "42...");
    }
}
