//! Shared configuration constants and environment helpers.
//!
//! Defaults live here so the LLM client, the tools and the server agree on
//! one set of values.

use std::time::Duration;

/// Default endpoint constants.
pub mod endpoints {
    pub const OPENAI: &str = "https://api.openai.com/v1";
    pub const SERPAPI: &str = "https://serpapi.com/search";
    pub const OPENWEATHERMAP: &str = "https://api.openweathermap.org/data/2.5";
    pub const EXCHANGE_RATE: &str = "https://api.exchangerate-api.com/v4/latest";
    pub const WORLD_TIME: &str = "http://worldtimeapi.org/api/timezone";
    pub const TELEGRAM: &str = "https://api.telegram.org";
}

/// Default model constants.
pub mod models {
    pub const OPENAI_DEFAULT: &str = "gpt-3.5-turbo";
}

/// Environment variable names.
pub mod env_vars {
    pub const HOST: &str = "HOST";
    pub const PORT: &str = "PORT";
    pub const TRUSTED_PROXIES: &str = "TRUSTED_PROXIES";
    pub const ENVIRONMENT: &str = "WAYFARER_ENV";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_JSON: &str = "WAYFARER_LOG_JSON";

    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_ENDPOINT: &str = "OPENAI_ENDPOINT";
    pub const LLM_MODEL: &str = "LLM_MODEL";
    pub const LLM_MAX_TOKENS: &str = "LLM_MAX_TOKENS";
    pub const LLM_TEMPERATURE: &str = "LLM_TEMPERATURE";

    pub const SERPAPI_API_KEY: &str = "SERPAPI_API_KEY";
    pub const WEATHER_API_KEY: &str = "WEATHER_API_KEY";
    pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

    pub const RATE_LIMIT_WINDOW_MS: &str = "RATE_LIMIT_WINDOW_MS";
    pub const RATE_LIMIT_MAX_REQUESTS: &str = "RATE_LIMIT_MAX_REQUESTS";
    pub const MAX_RESPONSE_LENGTH: &str = "MAX_RESPONSE_LENGTH";
}

/// Default values.
pub mod defaults {
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 3000;
    pub const TRUSTED_PROXIES: usize = 1;
    pub const MAX_TOKENS: u32 = 1000;
    pub const TELEGRAM_MAX_TOKENS: u32 = 500;
    pub const TEMPERATURE: f32 = 0.7;
    pub const LLM_TIMEOUT_SECS: u64 = 60;

    pub const RATE_LIMIT_WINDOW_MS: u64 = 900_000;
    pub const RATE_LIMIT_MAX_REQUESTS: u32 = 100;
    pub const CHAT_RATE_LIMIT_WINDOW_MS: u64 = 300_000;
    pub const CHAT_RATE_LIMIT_MAX_REQUESTS: u32 = 20;

    /// Longest accepted inbound message, in characters.
    pub const MAX_MESSAGE_LENGTH: usize = 4000;
    pub const MAX_RESPONSE_LENGTH: usize = 4000;

    pub const MAX_CONVERSATION_MESSAGES: usize = 20;
    pub const CONVERSATION_MAX_IDLE_SECS: u64 = 24 * 60 * 60;
    pub const CONVERSATION_CLEANUP_INTERVAL_SECS: u64 = 60 * 60;

    pub const WEB_HISTORY: usize = 8;
    pub const TELEGRAM_HISTORY: usize = 4;

    pub const SEARCH_TIMEOUT_SECS: u64 = 10;
    pub const WEATHER_TIMEOUT_SECS: u64 = 8;
    pub const CURRENCY_TIMEOUT_SECS: u64 = 10;
    pub const TIMEZONE_TIMEOUT_SECS: u64 = 8;

    pub const RETRY_MAX_ATTEMPTS: u32 = 3;
    pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;
    pub const CIRCUIT_COOLDOWN_SECS: u64 = 300;
}

/// Whether the process runs in the `test` environment.
///
/// Background sweeps are not started there.
pub fn is_test_environment() -> bool {
    std::env::var(env_vars::ENVIRONMENT)
        .map(|v| v.eq_ignore_ascii_case("test"))
        .unwrap_or(false)
}

/// Read a non-empty environment variable.
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse an environment variable, falling back to `default`.
pub fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Rate-limit window for the general API routes.
pub fn rate_limit_window() -> Duration {
    Duration::from_millis(env_or(
        env_vars::RATE_LIMIT_WINDOW_MS,
        defaults::RATE_LIMIT_WINDOW_MS,
    ))
}

/// Request budget per window for the general API routes.
pub fn rate_limit_max_requests() -> u32 {
    env_or(
        env_vars::RATE_LIMIT_MAX_REQUESTS,
        defaults::RATE_LIMIT_MAX_REQUESTS,
    )
}

/// Longest reply sent to messaging surfaces before truncation kicks in.
pub fn max_response_length() -> usize {
    env_or(
        env_vars::MAX_RESPONSE_LENGTH,
        defaults::MAX_RESPONSE_LENGTH,
    )
}

/// Normalize an OpenAI-compatible endpoint so it ends with `/v1`.
pub fn normalize_openai_endpoint(endpoint: String) -> String {
    let mut endpoint = endpoint.trim_end_matches('/').to_string();
    if !endpoint.ends_with("/v1") {
        endpoint = format!("{}/v1", endpoint);
    }
    endpoint
}

/// An API key is usable when it is reasonably long and carries no
/// surrounding whitespace.
pub fn is_valid_api_key(key: &str) -> bool {
    key.len() > 10 && key.trim() == key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_openai_endpoint() {
        assert_eq!(
            normalize_openai_endpoint("https://api.openai.com".to_string()),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            normalize_openai_endpoint("https://api.openai.com/v1/".to_string()),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            normalize_openai_endpoint("http://localhost:8080/v1".to_string()),
            "http://localhost:8080/v1"
        );
    }

    #[test]
    fn test_is_valid_api_key() {
        assert!(is_valid_api_key("sk-1234567890abcdef"));
        assert!(!is_valid_api_key("short"));
        assert!(!is_valid_api_key(" sk-1234567890abcdef"));
        assert!(!is_valid_api_key("sk-1234567890abcdef\n"));
    }

    #[test]
    fn test_env_or_falls_back() {
        let value: u32 = env_or("WAYFARER_TEST_UNSET_VARIABLE", 42);
        assert_eq!(value, 42);
    }
}
