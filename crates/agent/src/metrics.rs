//! Request, tool and conversation counters.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use wayfarer_core::Platform;

/// Conversation lengths kept for the average.
const MAX_CONVERSATION_SAMPLES: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counter {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

impl Counter {
    fn record(&mut self, success: bool) {
        self.total += 1;
        if success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Success rate as a percentage string, `"0%"` when empty.
    pub fn success_rate(&self) -> String {
        if self.total == 0 {
            return "0%".to_string();
        }
        format!("{:.2}%", self.successful as f64 / self.total as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ToolStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub avg_duration_ms: f64,
}

/// Response-time histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResponseBuckets {
    /// Under one second.
    pub fast: u64,
    /// One to five seconds.
    pub medium: u64,
    /// Five to thirty seconds.
    pub slow: u64,
    pub very_slow: u64,
}

impl ResponseBuckets {
    fn record(&mut self, duration: Duration) {
        match duration.as_millis() {
            0..=999 => self.fast += 1,
            1000..=4999 => self.medium += 1,
            5000..=29999 => self.slow += 1,
            _ => self.very_slow += 1,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    requests: Counter,
    by_endpoint: BTreeMap<String, Counter>,
    by_platform: BTreeMap<String, u64>,
    tools: Counter,
    by_tool: BTreeMap<String, ToolStats>,
    response_total_ms: u128,
    response_count: u64,
    response_min_ms: Option<u64>,
    response_max_ms: u64,
    buckets: ResponseBuckets,
    conversations_total: u64,
    conversations_active: u64,
    conversation_lengths: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: String,
    pub by_endpoint: BTreeMap<String, Counter>,
    pub by_platform: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolMetrics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: String,
    pub by_tool: BTreeMap<String, ToolStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetrics {
    pub avg_response_time_ms: u64,
    pub min_response_time_ms: u64,
    pub max_response_time_ms: u64,
    pub response_time_distribution: ResponseBuckets,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationMetrics {
    pub total: u64,
    pub active: u64,
    pub avg_messages_per_conversation: f64,
}

/// Point-in-time copy of all metrics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_ms: u64,
    pub uptime_formatted: String,
    pub requests: RequestMetrics,
    pub tools: ToolMetrics,
    pub performance: PerformanceMetrics,
    pub conversations: ConversationMetrics,
}

/// Process-lifetime metrics, owned by the server state.
pub struct MetricsCollector {
    inner: RwLock<Inner>,
    started: RwLock<Instant>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            started: RwLock::new(Instant::now()),
        }
    }

    /// Record a finished request against `endpoint`.
    pub async fn record_request(&self, endpoint: &str, duration: Duration, success: bool) {
        let mut inner = self.inner.write().await;
        inner.requests.record(success);
        inner
            .by_endpoint
            .entry(endpoint.to_string())
            .or_default()
            .record(success);

        let ms = duration.as_millis();
        let ms_u64 = u64::try_from(ms).unwrap_or(u64::MAX);
        inner.response_total_ms += ms;
        inner.response_count += 1;
        inner.response_min_ms = Some(inner.response_min_ms.map_or(ms_u64, |m| m.min(ms_u64)));
        inner.response_max_ms = inner.response_max_ms.max(ms_u64);
        inner.buckets.record(duration);

        debug!(
            category = "metrics",
            endpoint,
            duration_ms = ms_u64,
            success,
            total_requests = inner.requests.total,
            "Request metrics recorded"
        );
    }

    /// Count a message handled on `platform`.
    pub async fn record_message(&self, platform: Platform) {
        *self
            .inner
            .write()
            .await
            .by_platform
            .entry(platform.to_string())
            .or_default() += 1;
    }

    pub async fn record_tool(&self, tool: &str, duration: Duration, success: bool) {
        let mut inner = self.inner.write().await;
        inner.tools.record(success);

        let stats = inner.by_tool.entry(tool.to_string()).or_default();
        stats.total += 1;
        if success {
            stats.successful += 1;
        } else {
            stats.failed += 1;
        }
        let ms = duration.as_secs_f64() * 1000.0;
        stats.avg_duration_ms += (ms - stats.avg_duration_ms) / stats.total as f64;

        debug!(
            category = "metrics",
            tool,
            duration_ms = ms,
            success,
            "Tool usage recorded"
        );
    }

    /// Record a finished conversation of `message_count` messages.
    pub async fn record_conversation(&self, message_count: usize) {
        let mut inner = self.inner.write().await;
        inner.conversations_total += 1;
        inner.conversation_lengths.push(message_count);
        if inner.conversation_lengths.len() > MAX_CONVERSATION_SAMPLES {
            let excess = inner.conversation_lengths.len() - MAX_CONVERSATION_SAMPLES;
            inner.conversation_lengths.drain(..excess);
        }
    }

    pub async fn set_active_conversations(&self, count: usize) {
        self.inner.write().await.conversations_active = count as u64;
    }

    pub async fn uptime(&self) -> Duration {
        self.started.read().await.elapsed()
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.uptime().await;
        let inner = self.inner.read().await;

        let avg_response = if inner.response_count > 0 {
            (inner.response_total_ms as f64 / inner.response_count as f64).round() as u64
        } else {
            0
        };
        let avg_messages = if inner.conversation_lengths.is_empty() {
            0.0
        } else {
            let sum: usize = inner.conversation_lengths.iter().sum();
            let avg = sum as f64 / inner.conversation_lengths.len() as f64;
            (avg * 10.0).round() / 10.0
        };

        MetricsSnapshot {
            uptime_ms: u64::try_from(uptime.as_millis()).unwrap_or(u64::MAX),
            uptime_formatted: format_uptime(uptime),
            requests: RequestMetrics {
                total: inner.requests.total,
                successful: inner.requests.successful,
                failed: inner.requests.failed,
                success_rate: inner.requests.success_rate(),
                by_endpoint: inner.by_endpoint.clone(),
                by_platform: inner.by_platform.clone(),
            },
            tools: ToolMetrics {
                total: inner.tools.total,
                successful: inner.tools.successful,
                failed: inner.tools.failed,
                success_rate: inner.tools.success_rate(),
                by_tool: inner.by_tool.clone(),
            },
            performance: PerformanceMetrics {
                avg_response_time_ms: avg_response,
                min_response_time_ms: inner.response_min_ms.unwrap_or(0),
                max_response_time_ms: inner.response_max_ms,
                response_time_distribution: inner.buckets,
            },
            conversations: ConversationMetrics {
                total: inner.conversations_total,
                active: inner.conversations_active,
                avg_messages_per_conversation: avg_messages,
            },
        }
    }

    /// Clear everything and restart the uptime clock.
    pub async fn reset(&self) {
        *self.inner.write().await = Inner::default();
        *self.started.write().await = Instant::now();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// `"2d 3h 4m"`, `"3h 4m"`, `"4m 5s"` or `"5s"`.
pub fn format_uptime(uptime: Duration) -> String {
    let seconds = uptime.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h {}m", days, hours % 24, minutes % 60)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
