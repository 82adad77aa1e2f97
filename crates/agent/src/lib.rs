//! Wayfarer agent crate.
//!
//! The layer between the chat surfaces and the language model:
//!
//! - **Conversation store**: rolling per-user history, idle eviction
//! - **Resilience**: retries, per-service circuit breakers, fallback text
//! - **Metrics**: request, tool and conversation counters
//! - **Orchestrator**: message in, reply out, tool calls in between
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wayfarer_agent::{ResponseOrchestrator, Surface};
//! use wayfarer_llm::{OpenAiClient, OpenAiConfig};
//! use wayfarer_tools::{default_registry, ToolsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let llm = OpenAiClient::new(OpenAiConfig::new("sk-..."))?;
//!     let tools = default_registry(&ToolsConfig::from_env());
//!     let orchestrator = ResponseOrchestrator::new(Arc::new(llm), Arc::new(tools));
//!
//!     let reply = orchestrator
//!         .handle_message(Surface::Web, "127.0.0.1", "What's the weather in Lisbon?")
//!         .await?;
//!     println!("{}", reply.response);
//!     Ok(())
//! }
//! ```

pub mod conversation;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod prompts;
pub mod resilience;
pub mod validation;

pub use conversation::{spawn_cleanup, Conversation, ConversationStats, ConversationStore};
pub use error::{AgentError, Result};
pub use metrics::{format_uptime, MetricsCollector, MetricsSnapshot};
pub use orchestrator::{ChatReply, OrchestratorConfig, ResponseOrchestrator, Surface};
pub use resilience::{BackoffPolicy, Outcome, RecoveryConfig, RecoveryService, ServiceStatus};
pub use validation::{sanitize_text, validate_message, ValidationError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
