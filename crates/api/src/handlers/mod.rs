//! API handlers organized by domain.

pub mod basic;
pub mod chat;
pub mod stats;

// Re-export ServerState so handlers can use it
pub use crate::server::ServerState;

pub use basic::{health_handler, not_found_handler};
pub use chat::{chat_handler, clear_handler};
pub use stats::stats_handler;
