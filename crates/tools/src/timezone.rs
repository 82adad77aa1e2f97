//! Local time lookup via WorldTimeAPI.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use wayfarer_core::config::{defaults, endpoints};
use wayfarer_core::tools::{object_schema, required_str, string_property, Result, Tool, ToolError};

use crate::http::{JsonClient, StatusMessages};

/// Common destinations and their IANA zones.
const CITY_TIMEZONES: &[(&str, &str)] = &[
    ("new york", "America/New_York"),
    ("london", "Europe/London"),
    ("paris", "Europe/Paris"),
    ("tokyo", "Asia/Tokyo"),
    ("sydney", "Australia/Sydney"),
    ("los angeles", "America/Los_Angeles"),
    ("chicago", "America/Chicago"),
    ("berlin", "Europe/Berlin"),
    ("rome", "Europe/Rome"),
    ("madrid", "Europe/Madrid"),
    ("moscow", "Europe/Moscow"),
    ("dubai", "Asia/Dubai"),
    ("singapore", "Asia/Singapore"),
    ("hong kong", "Asia/Hong_Kong"),
    ("mumbai", "Asia/Kolkata"),
    ("delhi", "Asia/Kolkata"),
    ("bangkok", "Asia/Bangkok"),
    ("seoul", "Asia/Seoul"),
    ("beijing", "Asia/Shanghai"),
    ("shanghai", "Asia/Shanghai"),
];

/// Resolve a free-form location to the zone identifier sent upstream.
pub fn resolve_timezone(location: &str) -> String {
    let normalized = location.trim().to_lowercase();
    CITY_TIMEZONES
        .iter()
        .find(|(city, _)| *city == normalized)
        .map(|(_, tz)| tz.to_string())
        .unwrap_or_else(|| location.trim().to_string())
}

/// `get_timezone_info` tool.
pub struct TimezoneTool {
    base_url: String,
    http: JsonClient,
}

impl TimezoneTool {
    pub fn new() -> Self {
        Self {
            base_url: endpoints::WORLD_TIME.to_string(),
            http: JsonClient::new(defaults::TIMEZONE_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn status_messages(location: &str) -> StatusMessages {
        StatusMessages {
            unauthorized: "Timezone service rejected the request".to_string(),
            not_found: Some(format!("Unknown timezone for location: {}", location)),
            rate_limited: "Timezone API rate limit exceeded".to_string(),
            unavailable: "Timezone service temporarily unavailable".to_string(),
        }
    }

    /// Look up the local time at `location`.
    ///
    /// Unknown locations produce a UTC-only answer rather than an error.
    pub async fn lookup(&self, location: &str) -> Result<String> {
        let timezone = resolve_timezone(location);
        let path = timezone
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);

        debug!(category = "tools", tool = "timezone", location, timezone = %timezone, "Requesting time");

        let data: WorldTimeResponse = match self
            .http
            .get_json(&url, &[], &Self::status_messages(location))
            .await
        {
            Ok(data) => data,
            Err(ToolError::Upstream { status: 404, .. }) => {
                return Ok(fallback_time_info(location, Utc::now()));
            }
            Err(err) => return Err(err),
        };

        match TimeInfo::try_from(data) {
            Ok(info) => Ok(info.render(location)),
            Err(reason) => {
                warn!(category = "tools", tool = "timezone", location, reason = %reason, "Unreadable time data");
                Ok(fallback_time_info(location, Utc::now()))
            }
        }
    }
}

impl Default for TimezoneTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TimezoneTool {
    fn name(&self) -> &str {
        "get_timezone_info"
    }

    fn description(&self) -> &str {
        "Get current time and timezone information for travel destinations"
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "location": string_property(
                    "City name, country, or timezone (e.g., \"New York\", \"London\", \"Tokyo\", \"America/New_York\")"
                )
            }),
            vec!["location"],
        )
    }

    fn service_key(&self) -> &str {
        "timezone"
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let location = required_str(&args, "location")?;
        self.lookup(location).await
    }
}

#[derive(Debug, Deserialize)]
struct WorldTimeResponse {
    datetime: String,
    timezone: String,
    utc_offset: String,
    day_of_week: u32,
    day_of_year: u32,
    week_number: u32,
}

struct TimeInfo {
    local: DateTime<FixedOffset>,
    timezone: String,
    utc_offset: String,
    day_of_week: u32,
    day_of_year: u32,
    week_number: u32,
}

impl TryFrom<WorldTimeResponse> for TimeInfo {
    type Error = chrono::ParseError;

    fn try_from(data: WorldTimeResponse) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            local: DateTime::parse_from_rfc3339(&data.datetime)?,
            timezone: data.timezone,
            utc_offset: data.utc_offset,
            day_of_week: data.day_of_week,
            day_of_year: data.day_of_year,
            week_number: data.week_number,
        })
    }
}

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

impl TimeInfo {
    fn render(&self, location: &str) -> String {
        let day_name = DAY_NAMES
            .get(self.day_of_week as usize)
            .copied()
            .unwrap_or("Unknown");
        format!(
            "🕐 **Time Information for {location}**\n\n\
             **Current Local Time:** {local}\n\n\
             **Timezone:** {tz}\n\
             **UTC Offset:** {offset}\n\
             **Day of Week:** {day_name}\n\
             **Day of Year:** {doy}\n\
             **Week Number:** {week}\n\n\
             **UTC Time:** {utc} UTC\n\n\
             *This information is useful for planning calls, meetings, and travel schedules.*",
            local = self.local.format("%A, %B %-d, %Y at %I:%M:%S %p"),
            tz = self.timezone,
            offset = self.utc_offset,
            doy = self.day_of_year,
            week = self.week_number,
            utc = self.local.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

/// Answer with the current UTC time when the zone cannot be resolved.
pub fn fallback_time_info(location: &str, now: DateTime<Utc>) -> String {
    format!(
        "🕐 **Time Information**\n\n\
         I couldn't get specific timezone data for \"{}\", but here's the current UTC time:\n\n\
         **Current UTC Time:** {} UTC\n\n\
         **Suggestion:** Try using a more specific location (like \"New York\" or \"London\") or a timezone name (like \"America/New_York\").\n\n\
         *For accurate local times when traveling, I recommend checking multiple sources and confirming timezone rules for your specific dates.*",
        location,
        now.format("%Y-%m-%d %H:%M:%S")
    )
}
