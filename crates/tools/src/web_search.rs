//! Web search tool backed by the DuckDuckGo Instant Answer API.
//!
//! The HTTP side sits behind [`SearchBackend`] so the tool can be exercised
//! without network access.

use async_trait::async_trait;
use chatterbox_core::error::ToolError;
use chatterbox_core::tool::{Tool, ToolResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Maximum number of results handed back to the model.
pub const MAX_RESULTS: usize = 3;

const DDG_ENDPOINT: &str = "https://api.duckduckgo.com/";

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub href: String,
    pub body: String,
}

/// Something that can answer a text query with ranked hits.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError>;
}

/// DuckDuckGo Instant Answer backend (no API key).
pub struct DuckDuckGoSearch {
    endpoint: String,
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self, ToolError> {
        Self::with_endpoint(DDG_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent(concat!("chatterbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "search_internet".into(),
                reason: format!("HTTP client: {e}"),
            })?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DdgResponse {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<DdgTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DdgTopic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<DdgTopic>,
    },
}

fn collect_topics(topics: &[DdgTopic], hits: &mut Vec<SearchHit>, limit: usize) {
    for topic in topics {
        if hits.len() >= limit {
            return;
        }
        match topic {
            DdgTopic::Entry { text, first_url } => {
                // Entries read "Title - description"
                let (title, body) = text
                    .split_once(" - ")
                    .map(|(t, b)| (t.to_string(), b.to_string()))
                    .unwrap_or_else(|| (text.clone(), text.clone()));
                hits.push(SearchHit {
                    title,
                    href: first_url.clone(),
                    body,
                });
            }
            DdgTopic::Group { topics } => collect_topics(topics, hits, limit),
        }
    }
}

fn hits_from_response(response: DdgResponse, limit: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    if !response.abstract_text.is_empty() && limit > 0 {
        hits.push(SearchHit {
            title: response.heading,
            href: response.abstract_url,
            body: response.abstract_text,
        });
    }
    collect_topics(&response.related_topics, &mut hits, limit);
    hits
}

#[async_trait]
impl SearchBackend for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        debug!(query, max_results, "Querying DuckDuckGo");

        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: "search_internet".into(),
            reason,
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("no_html", "1"), ("skip_disambig", "1")])
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "DuckDuckGo returned error");
            return Err(failed(format!("search API returned status {}", response.status())));
        }

        let parsed: DdgResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("could not parse search response: {e}")))?;

        Ok(hits_from_response(parsed, max_results))
    }
}

/// `search_internet`: look something up when a chatter asks for it.
pub struct WebSearchTool {
    backend: Box<dyn SearchBackend>,
}

impl WebSearchTool {
    pub fn new(backend: Box<dyn SearchBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "search_internet"
    }

    fn description(&self) -> &str {
        "Search the internet using DuckDuckGo. Returns up to 3 results. To be used only when a chat user asks for an internet search."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The query to search for."
                }
            }
        })
    }

    fn required_parameters(&self) -> Vec<String> {
        vec!["query".into()]
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let mut hits = self.backend.search(query, MAX_RESULTS).await?;
        hits.truncate(MAX_RESULTS);

        let data = serde_json::to_value(&hits).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })?;

        Ok(ToolResult {
            output: data.to_string(),
            data: Some(data),
        })
    }

    fn summarize(&self, result: &ToolResult) -> String {
        let count = result
            .data
            .as_ref()
            .and_then(|d| d.as_array())
            .map(|a| a.len())
            .unwrap_or(0);
        format!(
            "Tool {} returned {count} results. Results: {}",
            self.name(),
            result.output
        )
    }
}
