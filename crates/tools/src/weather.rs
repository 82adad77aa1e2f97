//! Current conditions from OpenWeatherMap.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use wayfarer_core::config::{defaults, endpoints};
use wayfarer_core::tools::{object_schema, required_str, string_property, Result, Tool, ToolError};

use crate::http::{JsonClient, StatusMessages};

/// `get_current_weather` tool.
pub struct WeatherTool {
    api_key: Option<String>,
    base_url: String,
    http: JsonClient,
}

impl WeatherTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: endpoints::OPENWEATHERMAP.to_string(),
            http: JsonClient::new(defaults::WEATHER_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn status_messages(location: &str) -> StatusMessages {
        StatusMessages {
            unauthorized: "Invalid Weather API key".to_string(),
            not_found: Some(format!("Weather data not found for location: {}", location)),
            rate_limited: "Weather API rate limit exceeded".to_string(),
            unavailable: "Weather service temporarily unavailable".to_string(),
        }
    }

    /// Fetch and format current conditions for `location`.
    pub async fn current_weather(&self, location: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolError::Unavailable("Weather service not available".to_string()))?;

        debug!(category = "tools", tool = "weather", location, "Requesting current weather");

        let url = format!("{}/weather", self.base_url.trim_end_matches('/'));
        let data: WeatherResponse = self
            .http
            .get_json(
                &url,
                &[("q", location), ("appid", api_key), ("units", "metric")],
                &Self::status_messages(location),
            )
            .await?;

        let report = WeatherReport::from(data);
        info!(
            category = "tools",
            tool = "weather",
            location = %report.location,
            temperature = report.temperature,
            "Weather data retrieved"
        );
        Ok(report.to_string())
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_current_weather"
    }

    fn description(&self) -> &str {
        "Get current weather information for a specific location"
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "location": string_property(
                    "The city name, state, and/or country (e.g., \"Paris, France\" or \"New York, NY\")"
                )
            }),
            vec!["location"],
        )
    }

    fn service_key(&self) -> &str {
        "weather"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let location = required_str(&args, "location")?;
        self.current_weather(location).await
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    name: String,
    #[serde(default)]
    timezone: i32,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    #[serde(default)]
    wind: Option<WindBlock>,
    sys: SysBlock,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    description: String,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct SysBlock {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

struct WeatherReport {
    location: String,
    temperature: i64,
    feels_like: i64,
    conditions: String,
    humidity: u32,
    wind_speed: f64,
    sunrise: String,
    sunset: String,
}

impl From<WeatherResponse> for WeatherReport {
    fn from(data: WeatherResponse) -> Self {
        let location = if data.sys.country.is_empty() {
            data.name
        } else {
            format!("{}, {}", data.name, data.sys.country)
        };
        Self {
            location,
            temperature: data.main.temp.round() as i64,
            feels_like: data.main.feels_like.round() as i64,
            conditions: data
                .weather
                .into_iter()
                .next()
                .map(|w| w.description)
                .unwrap_or_else(|| "unknown".to_string()),
            humidity: data.main.humidity,
            wind_speed: data.wind.map_or(0.0, |w| w.speed),
            sunrise: local_clock(data.sys.sunrise, data.timezone),
            sunset: local_clock(data.sys.sunset, data.timezone),
        }
    }
}

impl std::fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Current weather in {}:\nTemperature: {}°C (feels like {}°C)\nConditions: {}\nHumidity: {}%\nWind: {} m/s\nSunrise: {}\nSunset: {}",
            self.location,
            self.temperature,
            self.feels_like,
            self.conditions,
            self.humidity,
            self.wind_speed,
            self.sunrise,
            self.sunset
        )
    }
}

/// Render a unix timestamp as a local wall-clock time at the given UTC offset.
fn local_clock(unix_secs: i64, offset_secs: i32) -> String {
    let Some(time) = DateTime::<Utc>::from_timestamp(unix_secs, 0) else {
        return "unknown".to_string();
    };
    match FixedOffset::east_opt(offset_secs) {
        Some(offset) => time.with_timezone(&offset).format("%H:%M").to_string(),
        None => time.format("%H:%M").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server;

    const PARIS: &str = r#"{
        "name": "Paris",
        "timezone": 7200,
        "main": { "temp": 21.6, "feels_like": 21.2, "humidity": 60 },
        "weather": [{ "description": "scattered clouds" }],
        "wind": { "speed": 3.6 },
        "sys": { "country": "FR", "sunrise": 1718250000, "sunset": 1718307600 }
    }"#;

    #[test]
    fn test_unavailable_without_key() {
        let tool = WeatherTool::new(None);
        assert!(!tool.is_available());
        assert_eq!(tool.service_key(), "weather");
    }

    #[tokio::test]
    async fn test_execute_without_key_fails() {
        let tool = WeatherTool::new(None);
        let err = tool.execute(json!({ "location": "Paris" })).await.unwrap_err();
        assert_eq!(
            err,
            ToolError::Unavailable("Weather service not available".to_string())
        );
    }

    #[tokio::test]
    async fn test_formats_report() {
        let base = test_server::serve(200, PARIS).await;
        let tool = WeatherTool::new(Some("weather-key-1234".to_string())).with_base_url(base);
        let text = tool.execute(json!({ "location": "Paris" })).await.unwrap();

        assert!(text.starts_with("Current weather in Paris, FR:"));
        assert!(text.contains("Temperature: 22°C (feels like 21°C)"));
        assert!(text.contains("Conditions: scattered clouds"));
        assert!(text.contains("Humidity: 60%"));
        assert!(text.contains("Wind: 3.6 m/s"));
    }

    #[tokio::test]
    async fn test_not_found_names_location() {
        let base = test_server::serve(404, r#"{"cod":"404"}"#).await;
        let tool = WeatherTool::new(Some("weather-key-1234".to_string())).with_base_url(base);
        let err = tool.execute(json!({ "location": "Atlantis" })).await.unwrap_err();
        assert_eq!(err.to_string(), "Weather data not found for location: Atlantis");
    }

    #[tokio::test]
    async fn test_bad_key() {
        let base = test_server::serve(401, r#"{"cod":401}"#).await;
        let tool = WeatherTool::new(Some("weather-key-1234".to_string())).with_base_url(base);
        let err = tool.execute(json!({ "location": "Paris" })).await.unwrap_err();
        assert_eq!(err, ToolError::upstream(401, "Invalid Weather API key"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_local_clock_applies_offset() {
        assert_eq!(local_clock(0, 3600), "01:00");
        assert_eq!(local_clock(0, 0), "00:00");
    }
}
