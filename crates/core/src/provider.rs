//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a list of messages (plus optional tool
//! declarations) to a model and get one complete response back.
//!
//! Implementations: Ollama (native API), OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "llama3.2:3b-instruct-q4_0")
    pub model: String,

    /// The conversation messages, system message first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.2
}

/// A tool declaration sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,

    /// Names of parameters the model must supply
    #[serde(default)]
    pub required: Vec<String>,
}

impl ToolDefinition {
    /// The parameter schema with the `required` list folded in, as function
    /// calling APIs expect it.
    pub fn schema(&self) -> serde_json::Value {
        let mut schema = self.parameters.clone();
        if let Some(obj) = schema.as_object_mut() {
            obj.insert("required".into(), serde_json::json!(self.required));
        }
        schema
    }
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The model gateway calls
/// `complete()` without knowing which provider is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_request_defaults() {
        let req: ProviderRequest =
            serde_json::from_str(r#"{"model":"llama3.2","messages":[]}"#).unwrap();
        assert!((req.temperature - 0.2).abs() < f32::EPSILON);
        assert!(req.tools.is_empty());
    }

    #[test]
    fn schema_folds_in_required_fields() {
        let tool = ToolDefinition {
            name: "search_internet".into(),
            description: "Search the internet".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The query to search for." }
                }
            }),
            required: vec!["query".into()],
        };
        let schema = tool.schema();
        assert_eq!(schema["required"], serde_json::json!(["query"]));
        assert_eq!(schema["properties"]["query"]["type"], "string");
    }
}
