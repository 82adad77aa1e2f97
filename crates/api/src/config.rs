//! Configuration loading for the Wayfarer server.
//!
//! Sources are layered, later ones winning:
//! 1. Built-in defaults
//! 2. `config.toml` (or the file passed with `--config`)
//! 3. Environment variables
//!
//! The merged result is validated once before the server starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use wayfarer_agent::OrchestratorConfig;
use wayfarer_core::config::{
    defaults, endpoints, env_string, env_vars, is_valid_api_key, models,
    normalize_openai_endpoint,
};
use wayfarer_core::Error;
use wayfarer_llm::OpenAiConfig;
use wayfarer_tools::ToolsConfig;

use crate::rate_limit::RateLimitConfig;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Upper bound for `server.trusted_proxies`.
pub const MAX_TRUSTED_PROXIES: usize = 10;

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => bail!("unknown environment '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory served for non-API paths.
    pub web_root: PathBuf,
    /// Reverse proxies in front of the server that append to
    /// `x-forwarded-for`. `0` ignores the header entirely.
    pub trusted_proxies: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            web_root: PathBuf::from("web"),
            trusted_proxies: defaults::TRUSTED_PROXIES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: endpoints::OPENAI.to_string(),
            model: models::OPENAI_DEFAULT.to_string(),
            temperature: defaults::TEMPERATURE,
            max_tokens: defaults::MAX_TOKENS,
            timeout_secs: defaults::LLM_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolKeys {
    pub serpapi_api_key: Option<String>,
    pub weather_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_ms: defaults::RATE_LIMIT_WINDOW_MS,
            max_requests: defaults::RATE_LIMIT_MAX_REQUESTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub max_response_length: usize,
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_response_length: defaults::MAX_RESPONSE_LENGTH,
            log_level: "info".to_string(),
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub tools: ToolKeys,
    pub telegram: TelegramSettings,
    pub rate_limit: RateLimitSettings,
    pub app: AppSettings,
}

impl AppConfig {
    /// Load, merge and validate configuration.
    ///
    /// An explicit `path` must exist; the default `config.toml` is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                info!(category = "config", "Loading config from environment variables");
                Self::default()
            }
        };

        config.apply_overrides(env_string);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        info!(category = "config", "Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("invalid {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    ///
    /// Unparseable numbers are warned about and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(env) = lookup(env_vars::ENVIRONMENT) {
            match env.parse() {
                Ok(env) => self.environment = env,
                Err(e) => warn!(category = "config", "Ignoring {}: {}", env_vars::ENVIRONMENT, e),
            }
        }

        if let Some(host) = lookup(env_vars::HOST) {
            self.server.host = host;
        }
        parse_into(&lookup, env_vars::PORT, &mut self.server.port);
        parse_into(&lookup, env_vars::TRUSTED_PROXIES, &mut self.server.trusted_proxies);

        if let Some(key) = lookup(env_vars::OPENAI_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(endpoint) = lookup(env_vars::OPENAI_ENDPOINT) {
            self.llm.endpoint = endpoint;
        }
        if let Some(model) = lookup(env_vars::LLM_MODEL) {
            self.llm.model = model;
        }
        parse_into(&lookup, env_vars::LLM_MAX_TOKENS, &mut self.llm.max_tokens);
        parse_into(&lookup, env_vars::LLM_TEMPERATURE, &mut self.llm.temperature);

        if let Some(key) = lookup(env_vars::SERPAPI_API_KEY) {
            self.tools.serpapi_api_key = Some(key);
        }
        if let Some(key) = lookup(env_vars::WEATHER_API_KEY) {
            self.tools.weather_api_key = Some(key);
        }
        if let Some(token) = lookup(env_vars::TELEGRAM_BOT_TOKEN) {
            self.telegram.bot_token = Some(token);
        }

        parse_into(&lookup, env_vars::RATE_LIMIT_WINDOW_MS, &mut self.rate_limit.window_ms);
        parse_into(
            &lookup,
            env_vars::RATE_LIMIT_MAX_REQUESTS,
            &mut self.rate_limit.max_requests,
        );
        parse_into(
            &lookup,
            env_vars::MAX_RESPONSE_LENGTH,
            &mut self.app.max_response_length,
        );
        if let Some(level) = lookup(env_vars::LOG_LEVEL) {
            self.app.log_level = level;
        }
    }

    /// Check required settings and drop malformed optional keys.
    pub fn validate(&mut self) -> wayfarer_core::Result<()> {
        if !matches!(
            self.app.log_level.as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(Error::config(format!(
                "log level '{}' is not one of error, warn, info, debug, trace",
                self.app.log_level
            )));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_ms == 0 {
            return Err(Error::config("rate limit window and budget must be positive"));
        }
        if self.server.trusted_proxies > MAX_TRUSTED_PROXIES {
            return Err(Error::config(format!(
                "trusted_proxies must be at most {}",
                MAX_TRUSTED_PROXIES
            )));
        }
        if self.app.max_response_length < 200 {
            return Err(Error::config("max_response_length must be at least 200"));
        }

        match self.llm.api_key.as_deref() {
            Some(key) if is_valid_api_key(key) => {}
            Some(_) if self.environment == Environment::Test => {}
            None if self.environment == Environment::Test => {
                self.llm.api_key = Some("test-key".to_string());
            }
            Some(_) => {
                return Err(Error::config(format!(
                    "{} is malformed",
                    env_vars::OPENAI_API_KEY
                )))
            }
            None => {
                return Err(Error::config(format!(
                    "{} is required",
                    env_vars::OPENAI_API_KEY
                )))
            }
        }

        drop_invalid_key(&mut self.tools.serpapi_api_key, env_vars::SERPAPI_API_KEY);
        drop_invalid_key(&mut self.tools.weather_api_key, env_vars::WEATHER_API_KEY);
        drop_invalid_key(&mut self.telegram.bot_token, env_vars::TELEGRAM_BOT_TOKEN);

        self.llm.endpoint = normalize_openai_endpoint(self.llm.endpoint.clone());
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_test(&self) -> bool {
        self.environment == Environment::Test
    }

    pub fn openai_config(&self) -> OpenAiConfig {
        let mut config = OpenAiConfig::new(self.llm.api_key.clone().unwrap_or_default())
            .with_base_url(self.llm.endpoint.clone())
            .with_model(self.llm.model.clone())
            .with_timeout_secs(self.llm.timeout_secs);
        config.temperature = self.llm.temperature;
        config.max_tokens = self.llm.max_tokens;
        config
    }

    pub fn tools_config(&self) -> ToolsConfig {
        ToolsConfig {
            serpapi_api_key: self.tools.serpapi_api_key.clone(),
            weather_api_key: self.tools.weather_api_key.clone(),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_tokens: self.llm.max_tokens,
            max_response_length: self.app.max_response_length,
            ..OrchestratorConfig::default()
        }
    }

    pub fn api_rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::api().with_budget(
            self.rate_limit.max_requests,
            Duration::from_millis(self.rate_limit.window_ms),
        )
    }

    pub fn chat_rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::chat()
    }
}

fn parse_into<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => warn!(category = "config", "Ignoring {}: '{}' is not a valid value", name, raw),
        }
    }
}

fn drop_invalid_key(key: &mut Option<String>, name: &str) {
    if key.as_deref().is_some_and(|k| !is_valid_api_key(k)) {
        warn!(category = "config", "{} looks malformed, treating it as unset", name);
        *key = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
environment = "production"

[server]
port = 8080

[llm]
api_key = "sk-test-1234567890"
model = "gpt-4o-mini"

[rate_limit]
max_requests = 50
"#;
        let mut config = AppConfig::from_toml_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.rate_limit.max_requests, 50);
        assert_eq!(config.rate_limit.window_ms, 900_000);
        assert_eq!(config.llm.endpoint, "https://api.openai.com/v1");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_toml_str("[server]\nport = 8080\n").unwrap();
        config.apply_overrides(lookup(&[
            ("PORT", "9000"),
            ("OPENAI_API_KEY", "sk-env-1234567890"),
            ("OPENAI_ENDPOINT", "http://localhost:11434"),
            ("RATE_LIMIT_MAX_REQUESTS", "not-a-number"),
        ]));
        config.validate().unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env-1234567890"));
        assert_eq!(config.llm.endpoint, "http://localhost:11434/v1");
        assert_eq!(config.rate_limit.max_requests, 100);
    }

    #[test]
    fn test_openai_key_required_outside_test() {
        let mut config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: OPENAI_API_KEY is required"
        );

        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[("WAYFARER_ENV", "test")]));
        config.validate().unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("test-key"));
    }

    #[test]
    fn test_malformed_optional_keys_are_dropped() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("OPENAI_API_KEY", "sk-env-1234567890"),
            ("WEATHER_API_KEY", "short"),
            ("SERPAPI_API_KEY", "serp-1234567890abc"),
        ]));
        config.validate().unwrap();

        assert!(config.tools.weather_api_key.is_none());
        assert!(config.tools_config().serpapi_api_key.is_some());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-env-1234567890".into());
        config.app.log_level = "loud".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_trusted_proxies() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-env-1234567890".into());
        assert_eq!(config.server.trusted_proxies, 1);

        config.apply_overrides(lookup(&[("TRUSTED_PROXIES", "0")]));
        config.validate().unwrap();
        assert_eq!(config.server.trusted_proxies, 0);

        config.server.trusted_proxies = MAX_TRUSTED_PROXIES + 1;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_derived_configs() {
        let mut config = AppConfig::default();
        config.rate_limit.window_ms = 60_000;
        config.rate_limit.max_requests = 10;
        config.app.max_response_length = 1000;

        let api = config.api_rate_limit();
        assert_eq!(api.max_requests, 10);
        assert_eq!(api.per_duration, Duration::from_secs(60));
        assert_eq!(config.chat_rate_limit().max_requests, 20);
        assert_eq!(config.orchestrator_config().max_response_length, 1000);
    }
}
