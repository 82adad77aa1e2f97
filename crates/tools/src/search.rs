//! Web search through SerpApi's Google engine.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use wayfarer_core::config::{defaults, endpoints};
use wayfarer_core::tools::{
    object_schema, optional_str, required_str, string_property, Result, Tool, ToolError,
};

use crate::http::{JsonClient, StatusMessages};

const RESULT_COUNT: &str = "5";

/// `search_web` tool.
pub struct WebSearchTool {
    api_key: Option<String>,
    base_url: String,
    http: JsonClient,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: endpoints::SERPAPI.to_string(),
            http: JsonClient::new(defaults::SEARCH_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn status_messages() -> StatusMessages {
        StatusMessages {
            unauthorized: "Invalid SERP API key".to_string(),
            not_found: None,
            rate_limited: "Search rate limit exceeded".to_string(),
            unavailable: "Web search temporarily unavailable".to_string(),
        }
    }

    /// Run a search and return formatted hits.
    pub async fn search(&self, query: &str, country: &str) -> Result<Vec<SearchHit>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolError::Unavailable("Web search service not available".to_string()))?;

        let data: SerpResponse = self
            .http
            .get_json(
                &self.base_url,
                &[
                    ("api_key", api_key),
                    ("engine", "google"),
                    ("q", query),
                    ("num", RESULT_COUNT),
                    ("gl", country),
                    ("hl", "en"),
                ],
                &Self::status_messages(),
            )
            .await?;

        let hits = data.into_hits();
        info!(category = "tools", tool = "search", query, results = hits.len(), "Search completed");
        Ok(hits)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for current information about travel, destinations, weather, events, or any other topics"
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "query": string_property("The search query"),
                "country": {
                    "type": "string",
                    "description": "Country code for localized results (e.g., \"us\", \"uk\", \"ca\")",
                    "default": "us"
                }
            }),
            vec!["query"],
        )
    }

    fn service_key(&self) -> &str {
        "search"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let query = required_str(&args, "query")?;
        let country = optional_str(&args, "country").unwrap_or("us");
        let hits = self.search(query, country).await?;
        if hits.is_empty() {
            return Ok(format!("No web results found for \"{}\".", query));
        }
        Ok(hits
            .iter()
            .map(SearchHit::to_string)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// One formatted search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub link: Option<String>,
}

impl std::fmt::Display for SearchHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.link {
            Some(link) => write!(f, "{}: {} ({})", self.title, self.snippet, link),
            None => write!(f, "{}: {}", self.title, self.snippet),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    answer_box: Option<AnswerBox>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl SerpResponse {
    /// Answer box first, then organic results in rank order.
    fn into_hits(self) -> Vec<SearchHit> {
        let answer = self
            .answer_box
            .and_then(|b| b.answer.or(b.snippet))
            .map(|snippet| SearchHit {
                title: "Quick Answer".to_string(),
                snippet,
                link: None,
            });

        answer
            .into_iter()
            .chain(self.organic_results.into_iter().map(|r| SearchHit {
                title: r.title,
                snippet: r.snippet,
                link: r.link,
            }))
            .collect()
    }
}
