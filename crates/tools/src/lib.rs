//! Travel tools exposed to the language model.
//!
//! Four tools call public HTTP APIs (web search, weather, currency and
//! timezone); flight and hotel search are generated locally. All of them
//! implement [`wayfarer_core::Tool`] and are dispatched by name through the
//! [`ToolRegistry`].

pub mod currency;
pub mod flights;
pub mod hotels;
pub mod http;
pub mod registry;
pub mod search;
pub mod timezone;
pub mod weather;

use std::sync::Arc;

use wayfarer_core::config::{env_string, env_vars, is_valid_api_key};
use wayfarer_core::DynTool;

pub use currency::CurrencyTool;
pub use flights::FlightSearchTool;
pub use hotels::HotelSearchTool;
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use search::WebSearchTool;
pub use timezone::TimezoneTool;
pub use weather::WeatherTool;

/// Credentials for the keyed tools.
#[derive(Debug, Clone, Default)]
pub struct ToolsConfig {
    pub serpapi_api_key: Option<String>,
    pub weather_api_key: Option<String>,
}

impl ToolsConfig {
    /// Read keys from the environment, dropping malformed ones.
    pub fn from_env() -> Self {
        Self {
            serpapi_api_key: env_string(env_vars::SERPAPI_API_KEY).filter(|k| is_valid_api_key(k)),
            weather_api_key: env_string(env_vars::WEATHER_API_KEY).filter(|k| is_valid_api_key(k)),
        }
    }
}

/// Build every built-in tool.
pub fn builtin_tools(config: &ToolsConfig) -> Vec<DynTool> {
    vec![
        Arc::new(WebSearchTool::new(config.serpapi_api_key.clone())),
        Arc::new(WeatherTool::new(config.weather_api_key.clone())),
        Arc::new(CurrencyTool::new()),
        Arc::new(TimezoneTool::new()),
        Arc::new(FlightSearchTool::new()),
        Arc::new(HotelSearchTool::new()),
    ]
}

/// Registry with every built-in tool registered.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register_all(builtin_tools(config));
    registry
}
