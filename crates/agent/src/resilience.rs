//! Retry, circuit breaking and fallback text for tool calls.
//!
//! Every tool invocation goes through [`RecoveryService::execute_with_retry`].
//! A transient upstream failure never reaches the orchestrator as an error:
//! after the attempts are exhausted the caller gets a service-specific
//! fallback message instead.
//!
//! Breakers are keyed by service (`weather`, `currency`, ...). Each failed
//! attempt increments the service's error count; once it reaches the
//! threshold the breaker opens for the cooldown and calls are rejected
//! without invoking the operation. Any success resets the count.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use wayfarer_core::config::defaults;
use wayfarer_core::ToolError;

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt; doubles after each further one.
    pub base: Duration,
    /// Upper bound on a single delay, before jitter.
    pub max: Option<Duration>,
    /// Relative jitter applied to each delay, `0.25` meaning ±25%.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Some(Duration::from_secs(30)),
            jitter: 0.25,
        }
    }
}

impl BackoffPolicy {
    /// Plain `2^attempt` seconds with no cap and no jitter.
    pub fn unbounded() -> Self {
        Self {
            base: Duration::from_secs(2),
            max: None,
            jitter: 0.0,
        }
    }

    /// Retry immediately.
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            max: Some(Duration::ZERO),
            jitter: 0.0,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based), without jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.base.saturating_mul(factor);
        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    fn jittered<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.delay(attempt);
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = 1.0 + rng.gen_range(-self.jitter..=self.jitter);
        delay.mul_f64(factor.max(0.0))
    }
}

/// Resilience settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryConfig {
    pub max_attempts: u32,
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::RETRY_MAX_ATTEMPTS,
            failure_threshold: defaults::CIRCUIT_FAILURE_THRESHOLD,
            cooldown: Duration::from_secs(defaults::CIRCUIT_COOLDOWN_SECS),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// What came out of a guarded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation succeeded.
    Completed { output: String, attempts: u32 },
    /// Every attempt failed; `output` is the fallback text.
    Fallback {
        output: String,
        attempts: u32,
        error: ToolError,
    },
    /// The operation rejected its arguments. Not counted against the breaker.
    InvalidInput {
        output: String,
        attempts: u32,
        error: ToolError,
    },
    /// The breaker was open and the operation was not invoked.
    Rejected { output: String },
}

impl Outcome {
    pub fn output(&self) -> &str {
        match self {
            Self::Completed { output, .. }
            | Self::Fallback { output, .. }
            | Self::InvalidInput { output, .. }
            | Self::Rejected { output } => output,
        }
    }

    pub fn into_output(self) -> String {
        match self {
            Self::Completed { output, .. }
            | Self::Fallback { output, .. }
            | Self::InvalidInput { output, .. }
            | Self::Rejected { output } => output,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts, .. }
            | Self::Fallback { attempts, .. }
            | Self::InvalidInput { attempts, .. } => *attempts,
            Self::Rejected { .. } => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[derive(Debug, Clone, Default)]
struct BreakerState {
    error_count: u32,
    open_until: Option<Instant>,
    reset_at: Option<DateTime<Utc>>,
}

impl BreakerState {
    fn is_open(&self, now: Instant) -> bool {
        self.open_until.is_some_and(|until| now < until)
    }
}

/// Per-service view for the stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    /// `available` or `unavailable`.
    pub status: &'static str,
    pub error_count: u32,
    pub circuit_open: bool,
    pub reset_time: Option<DateTime<Utc>>,
}

/// Retry and circuit-breaker wrapper shared by all tool calls.
pub struct RecoveryService {
    config: RecoveryConfig,
    breakers: RwLock<HashMap<String, BreakerState>>,
}

impl RecoveryService {
    pub fn new() -> Self {
        Self::with_config(RecoveryConfig::default())
    }

    pub fn with_config(config: RecoveryConfig) -> Self {
        Self {
            config,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Run `operation` with the configured number of attempts.
    pub async fn execute_with_retry<F, Fut>(&self, service: &str, operation: F) -> Outcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, ToolError>>,
    {
        self.execute_with_attempts(service, self.config.max_attempts, operation)
            .await
    }

    pub async fn execute_with_attempts<F, Fut>(
        &self,
        service: &str,
        max_attempts: u32,
        mut operation: F,
    ) -> Outcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, ToolError>>,
    {
        if self.check_open(service).await {
            warn!(category = "resilience", service, "Circuit open, rejecting call");
            return Outcome::Rejected {
                output: unavailable_message(service),
            };
        }

        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;
        let last_error = loop {
            attempt += 1;
            match operation().await {
                Ok(output) => {
                    self.record_success(service).await;
                    return Outcome::Completed {
                        output,
                        attempts: attempt,
                    };
                }
                Err(err @ ToolError::InvalidArguments(_)) => {
                    debug!(category = "resilience", service, error = %err, "Operation rejected its arguments");
                    return Outcome::InvalidInput {
                        output: format!("Error: {}", err),
                        attempts: attempt,
                        error: err,
                    };
                }
                Err(err) => {
                    warn!(
                        category = "resilience",
                        service,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Service attempt failed"
                    );
                    self.record_failure(service).await;

                    if attempt >= max_attempts || !err.is_retryable() {
                        break err;
                    }
                    let delay = self.config.backoff.jittered(attempt, &mut rand::thread_rng());
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        };

        error!(
            category = "resilience",
            service,
            attempts = attempt,
            error = %last_error,
            "Service failed, returning fallback"
        );
        Outcome::Fallback {
            output: fallback_response(service, &last_error),
            attempts: attempt,
            error: last_error,
        }
    }

    /// Whether the breaker is open now. An expired breaker is closed here.
    async fn check_open(&self, service: &str) -> bool {
        let now = Instant::now();
        let mut breakers = self.breakers.write().await;
        let Some(state) = breakers.get_mut(service) else {
            return false;
        };
        if state.is_open(now) {
            return true;
        }
        if state.open_until.take().is_some() {
            state.reset_at = None;
            info!(category = "resilience", service, "Circuit cooldown elapsed, closing");
        }
        false
    }

    async fn record_success(&self, service: &str) {
        let mut breakers = self.breakers.write().await;
        let state = breakers.entry(service.to_string()).or_default();
        state.error_count = 0;
        state.open_until = None;
        state.reset_at = None;
    }

    async fn record_failure(&self, service: &str) {
        let mut breakers = self.breakers.write().await;
        let state = breakers.entry(service.to_string()).or_default();
        state.error_count += 1;

        if state.error_count >= self.config.failure_threshold && !state.is_open(Instant::now()) {
            state.open_until = Some(Instant::now() + self.config.cooldown);
            let reset_at = chrono::Duration::from_std(self.config.cooldown)
                .ok()
                .map(|cooldown| Utc::now() + cooldown);
            state.reset_at = reset_at;
            warn!(
                category = "resilience",
                service,
                error_count = state.error_count,
                reset_time = ?reset_at,
                "Circuit breaker opened"
            );
        }
    }

    /// Current error count for a service.
    pub async fn error_count(&self, service: &str) -> u32 {
        self.breakers
            .read()
            .await
            .get(service)
            .map_or(0, |s| s.error_count)
    }

    pub async fn is_open(&self, service: &str) -> bool {
        self.breakers
            .read()
            .await
            .get(service)
            .is_some_and(|s| s.is_open(Instant::now()))
    }

    /// Status of every service that has been called.
    pub async fn service_status(&self) -> BTreeMap<String, ServiceStatus> {
        let now = Instant::now();
        self.breakers
            .read()
            .await
            .iter()
            .map(|(service, state)| {
                let open = state.is_open(now);
                let status = ServiceStatus {
                    status: if open { "unavailable" } else { "available" },
                    error_count: state.error_count,
                    circuit_open: open,
                    reset_time: if open { state.reset_at } else { None },
                };
                (service.clone(), status)
            })
            .collect()
    }
}

impl Default for RecoveryService {
    fn default() -> Self {
        Self::new()
    }
}

/// Short message returned while a breaker is open.
pub fn unavailable_message(service: &str) -> String {
    format!(
        "⚠️ {} service is temporarily unavailable. Please try again in a few minutes.",
        capitalize(service)
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Canned response for a service whose lookups keep failing.
pub fn fallback_response(service: &str, err: &ToolError) -> String {
    match service {
        "currency" => format!(
            "💱 **Currency Conversion Service Temporarily Unavailable**\n\n\
             I'm unable to get real-time exchange rates right now due to: {err}\n\n\
             **Alternative Options:**\n\
             • Check xe.com or google.com for current rates\n\
             • Use your bank's mobile app for rates\n\
             • Major credit cards typically offer competitive exchange rates\n\n\
             **Approximate rates (may be outdated):**\n\
             • 1 USD ≈ 0.85 EUR\n\
             • 1 USD ≈ 0.75 GBP\n\
             • 1 USD ≈ 110 JPY\n\
             • 1 EUR ≈ 1.18 USD\n\n\
             *For accurate rates, please check current financial websites.*"
        ),
        "weather" => format!(
            "🌤️ **Weather Service Temporarily Unavailable**\n\n\
             I'm unable to get current weather data due to: {err}\n\n\
             **Alternative Weather Sources:**\n\
             • weather.com or weather.gov\n\
             • AccuWeather mobile app\n\
             • Local weather apps for your region\n\
             • Google search \"weather [city name]\"\n\n\
             **General Travel Weather Tips:**\n\
             • Check weather 7-10 days before travel\n\
             • Pack layers for temperature variations\n\
             • Check seasonal weather patterns for your destination\n\
             • Consider weather-related travel insurance"
        ),
        "search" => format!(
            "🌐 **Web Search Service Temporarily Unavailable**\n\n\
             I'm unable to search the web right now due to: {err}\n\n\
             **Alternative Search Options:**\n\
             • Google.com for general searches\n\
             • TripAdvisor for travel reviews and recommendations\n\
             • Booking.com for hotels and accommodations\n\
             • Kayak or Expedia for flights and travel deals\n\n\
             **Travel Planning Resources:**\n\
             • Lonely Planet for destination guides\n\
             • Official tourism websites for cities/countries\n\
             • Travel blogs and social media for current insights"
        ),
        "flights" => format!(
            "✈️ **Flight Search Service Temporarily Unavailable**\n\n\
             I'm unable to search for flights right now due to: {err}\n\n\
             **Alternative Flight Booking Options:**\n\
             • **Direct Airline Websites**: Often best prices and policies\n\
             • **Meta-search Sites**: Kayak, Skyscanner, Google Flights\n\
             • **Online Travel Agencies**: Expedia, Booking.com, Priceline\n\
             • **Travel Agents**: For complex itineraries\n\n\
             **Flight Booking Tips:**\n\
             • Book 6-8 weeks ahead for domestic flights\n\
             • Book 2-3 months ahead for international flights\n\
             • Consider flexible dates for better prices\n\
             • Check multiple airports in large cities\n\
             • Compare round-trip vs. one-way prices"
        ),
        "hotels" => format!(
            "🏨 **Hotel Search Service Temporarily Unavailable**\n\n\
             I'm unable to search for hotels right now due to: {err}\n\n\
             **Alternative Accommodation Booking:**\n\
             • **Hotel Direct**: Best rates and cancellation policies\n\
             • **Booking Platforms**: Booking.com, Hotels.com, Expedia\n\
             • **Alternative Stays**: Airbnb, VRBO for apartments/homes\n\
             • **Hostels**: Hostelworld for budget-friendly options\n\n\
             **Booking Tips:**\n\
             • Book directly with hotels for loyalty benefits\n\
             • Check cancellation policies before booking\n\
             • Read recent reviews for current conditions\n\
             • Consider location vs. price trade-offs\n\
             • Look for package deals with flights"
        ),
        "timezone" => format!(
            "🕐 **Timezone Service Temporarily Unavailable**\n\n\
             I'm unable to get timezone information right now due to: {err}\n\n\
             **Alternative Time Sources:**\n\
             • worldclock.com or timeanddate.com\n\
             • Google search \"time in [city name]\"\n\
             • Your phone's world clock app\n\
             • Computer system clock when set to destination timezone\n\n\
             **Time Planning Tips:**\n\
             • Consider jet lag when planning activities\n\
             • Book calls/meetings accounting for time differences\n\
             • Check if destination observes daylight saving time\n\
             • Set your devices to destination time upon arrival"
        ),
        other => format!(
            "⚠️ **Service Temporarily Unavailable**\n\n\
             The {other} service is currently experiencing issues: {err}\n\n\
             **What you can do:**\n\
             • Try again in a few minutes\n\
             • Use alternative sources for this information\n\
             • Ask me about other travel services that are available\n\
             • Contact me later when the service has recovered\n\n\
             **Available Services:**\n\
             I can still help with other aspects of your travel planning that don't require this specific service."
        ),
    }
}
