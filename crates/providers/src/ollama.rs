//! Ollama provider using the native `/api/chat` endpoint.
//!
//! The native API differs from the OpenAI-compatible one in two ways that
//! matter here: tool call arguments arrive as a JSON object (not a string),
//! and tool calls carry no id, so one is synthesized per call.

use async_trait::async_trait;
use chatterbox_core::error::ProviderError;
use chatterbox_core::message::{Message, MessageToolCall, Role};
use chatterbox_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// A locally hosted model served by Ollama.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider talking to `base_url` (defaults to localhost:11434).
    pub fn new(base_url: Option<&str>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    fn to_api_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|tc| OllamaToolCall {
                        function: OllamaFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<OllamaTool> {
        tools
            .iter()
            .map(|t| OllamaTool {
                r#type: "function".into(),
                function: OllamaToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.schema(),
                },
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": false,
            "options": { "temperature": request.temperature },
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }
        body
    }

    fn into_response(api: OllamaChatResponse) -> ProviderResponse {
        let tool_calls = api
            .message
            .tool_calls
            .into_iter()
            .map(|tc| MessageToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                name: tc.function.name,
                arguments: match tc.function.arguments {
                    serde_json::Value::Null => serde_json::json!({}),
                    other => other,
                },
            })
            .collect();

        let usage = match (api.prompt_eval_count, api.eval_count) {
            (Some(prompt), Some(completion)) => Some(Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        ProviderResponse {
            message: Message {
                role: Role::Assistant,
                content: api.message.content,
                tool_calls,
            },
            usage,
            model: api.model,
        }
    }
}

#[async_trait]
impl chatterbox_core::Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending Ollama chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Ok(Self::into_response(api_response))
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    r#type: String,
    function: OllamaToolFunction,
}

#[derive(Debug, Serialize)]
struct OllamaToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatterbox_core::Provider;

    #[test]
    fn default_url() {
        let provider = OllamaProvider::new(None).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.base_url, "http://localhost:11434");

        let custom = OllamaProvider::new(Some("http://gpu-box:11434/")).unwrap();
        assert_eq!(custom.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn body_carries_temperature_and_tools() {
        let request = ProviderRequest {
            model: "llama3.2:3b-instruct-q4_0".into(),
            messages: vec![Message::system("be nice"), Message::user("alice: hi")],
            temperature: 0.2,
            tools: vec![ToolDefinition {
                name: "search_internet".into(),
                description: "Search".into(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
                required: vec!["query".into()],
            }],
        };
        let body = OllamaProvider::build_body(&request);
        assert_eq!(body["stream"], false);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "alice: hi");
        assert_eq!(body["tools"][0]["function"]["name"], "search_internet");
        assert_eq!(body["tools"][0]["function"]["parameters"]["required"][0], "query");
    }

    #[test]
    fn no_tools_key_when_none_offered() {
        let request = ProviderRequest {
            model: "m".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.2,
            tools: vec![],
        };
        let body = OllamaProvider::build_body(&request);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn parses_text_reply() {
        let api: OllamaChatResponse = serde_json::from_str(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hello chat!"},
                "done":true,"prompt_eval_count":12,"eval_count":4}"#,
        )
        .unwrap();
        let response = OllamaProvider::into_response(api);
        assert_eq!(response.message.content, "Hello chat!");
        assert!(response.message.tool_calls.is_empty());
        assert_eq!(response.usage.unwrap().total_tokens, 16);
    }

    #[test]
    fn parses_tool_calls_with_object_arguments() {
        let api: OllamaChatResponse = serde_json::from_str(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"",
                "tool_calls":[
                    {"function":{"name":"search_internet","arguments":{"query":"rust"}}},
                    {"function":{"name":"get_current_time"}}
                ]}}"#,
        )
        .unwrap();
        let response = OllamaProvider::into_response(api);
        let calls = &response.message.tool_calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "search_internet");
        assert_eq!(calls[0].arguments["query"], "rust");
        assert_eq!(calls[1].arguments, serde_json::json!({}));
        assert_ne!(calls[0].id, calls[1].id);
        assert!(response.usage.is_none());
    }
}
