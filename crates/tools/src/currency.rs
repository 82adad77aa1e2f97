//! Currency conversion via the free ExchangeRate-API.
//!
//! Rates are cached per base currency for an hour so repeated questions in a
//! conversation do not hit the upstream again.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use wayfarer_core::config::{defaults, endpoints};
use wayfarer_core::tools::{
    number_property, object_schema, required_str, string_property, Result, Tool, ToolError,
};

use crate::http::{JsonClient, StatusMessages};

const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

struct CachedRates {
    rates: HashMap<String, f64>,
    fetched_at: Instant,
}

/// `convert_currency` tool.
pub struct CurrencyTool {
    base_url: String,
    http: JsonClient,
    cache_ttl: Duration,
    cache: RwLock<HashMap<String, CachedRates>>,
}

impl CurrencyTool {
    pub fn new() -> Self {
        Self {
            base_url: endpoints::EXCHANGE_RATE.to_string(),
            http: JsonClient::new(defaults::CURRENCY_TIMEOUT_SECS),
            cache_ttl: CACHE_TTL,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn status_messages(from: &str) -> StatusMessages {
        StatusMessages {
            unauthorized: "Currency service rejected the request".to_string(),
            not_found: Some(format!("Currency {} not supported", from)),
            rate_limited: "Currency API rate limit exceeded".to_string(),
            unavailable: "Currency service temporarily unavailable".to_string(),
        }
    }

    async fn cached_rate(&self, from: &str, to: &str) -> Option<f64> {
        let cache = self.cache.read().await;
        let entry = cache.get(from)?;
        if entry.fetched_at.elapsed() >= self.cache_ttl {
            return None;
        }
        entry.rates.get(to).copied()
    }

    /// Exchange rate from `from` to `to`, using the cache when fresh.
    pub async fn rate(&self, from: &str, to: &str) -> Result<f64> {
        if let Some(rate) = self.cached_rate(from, to).await {
            debug!(category = "tools", tool = "currency", from, to, "Using cached rate");
            return Ok(rate);
        }

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), from);
        let data: RatesResponse = self
            .http
            .get_json(&url, &[], &Self::status_messages(from))
            .await?;

        let rate = data.rates.get(to).copied();
        self.cache.write().await.insert(
            from.to_string(),
            CachedRates {
                rates: data.rates,
                fetched_at: Instant::now(),
            },
        );

        rate.ok_or_else(|| ToolError::InvalidArguments(format!("Currency {} not supported", to)))
    }

    /// Convert and format.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<String> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        if from == to {
            return Ok(format!("{} {} = {} {} (same currency)", amount, from, amount, to));
        }

        let rate = self.rate(&from, &to).await?;
        let converted = amount * rate;
        info!(
            category = "tools",
            tool = "currency",
            from = %from,
            to = %to,
            amount,
            rate,
            "Currency conversion completed"
        );
        Ok(format_conversion(amount, &from, converted, &to, rate))
    }
}

impl Default for CurrencyTool {
    fn default() -> Self {
        Self::new()
    }
}

fn format_conversion(amount: f64, from: &str, converted: f64, to: &str, rate: f64) -> String {
    format!(
        "💱 **Currency Conversion**\n\n**{} {} = {:.2} {}**\n\nExchange Rate: 1 {} = {:.4} {}\n\n*Rates are updated every hour. For real-time rates for large transactions, please check with your bank or financial institution.*",
        amount, from, converted, to, from, rate, to
    )
}

/// Accept numbers and numeric strings.
fn parse_amount(args: &Value) -> Result<f64> {
    let amount = match args.get("amount") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match amount {
        Some(a) if a.is_finite() && a >= 0.0 => Ok(a),
        Some(_) => Err(ToolError::InvalidArguments(
            "Amount must be a non-negative number".to_string(),
        )),
        None => Err(ToolError::InvalidArguments(
            "Missing required parameter: amount".to_string(),
        )),
    }
}

#[async_trait]
impl Tool for CurrencyTool {
    fn name(&self) -> &str {
        "convert_currency"
    }

    fn description(&self) -> &str {
        "Convert currency amounts for travel planning and budgeting"
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "amount": number_property("Amount to convert"),
                "from": string_property("Source currency code (e.g., USD, EUR, GBP)"),
                "to": string_property("Target currency code (e.g., USD, EUR, GBP)")
            }),
            vec!["amount", "from", "to"],
        )
    }

    fn service_key(&self) -> &str {
        "currency"
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let amount = parse_amount(&args)?;
        let from = required_str(&args, "from")?;
        let to = required_str(&args, "to")?;
        self.convert(amount, from, to).await
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}
