//! Model Gateway — one model call, optionally under a wall-clock deadline.
//!
//! A bounded call runs in its own task. If the deadline elapses first the
//! task is aborted and whatever it would have produced is dropped with it,
//! so a stuck backend can never deliver a late reply into shared state.

use std::sync::Arc;
use std::time::Duration;

use chatterbox_core::error::GatewayError;
use chatterbox_core::history::Turn;
use chatterbox_core::message::Message;
use chatterbox_core::provider::{Provider, ProviderRequest, ToolDefinition};
use chatterbox_core::tool::ToolCall;
use tracing::{debug, warn};

/// What the model said: free text and/or tool requests, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GatewayReply {
    pub text: String,
    pub tool_requests: Vec<ToolCall>,
}

pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    /// A request for `system` followed by the conversation turns.
    pub fn conversation_request(
        &self,
        system: &str,
        turns: &[Turn],
        tools: Vec<ToolDefinition>,
    ) -> ProviderRequest {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(Message::system(system));
        messages.extend(turns.iter().map(Turn::to_message));
        self.request(messages, tools)
    }

    pub fn request(&self, messages: Vec<Message>, tools: Vec<ToolDefinition>) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            tools,
        }
    }

    /// Run one call. `None` means no deadline.
    pub async fn call(
        &self,
        request: ProviderRequest,
        deadline: Option<Duration>,
    ) -> Result<GatewayReply, GatewayError> {
        debug!(
            provider = self.provider.name(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            deadline_ms = deadline.map(|d| d.as_millis() as u64),
            "Calling model"
        );

        let response = match deadline {
            None => self.provider.complete(request).await?,
            Some(deadline) => {
                let provider = Arc::clone(&self.provider);
                let mut handle = tokio::spawn(async move { provider.complete(request).await });

                match tokio::time::timeout(deadline, &mut handle).await {
                    Ok(Ok(result)) => result?,
                    Ok(Err(join_error)) => {
                        return Err(GatewayError::Aborted(join_error.to_string()));
                    }
                    Err(_) => {
                        handle.abort();
                        warn!(
                            deadline_ms = deadline.as_millis() as u64,
                            "Model call exceeded its deadline, abandoning it"
                        );
                        return Err(GatewayError::DeadlineExceeded {
                            timeout_ms: deadline.as_millis() as u64,
                        });
                    }
                }
            }
        };

        Ok(GatewayReply {
            text: response.message.content,
            tool_requests: response
                .message
                .tool_calls
                .into_iter()
                .map(|tc| ToolCall {
                    id: tc.id,
                    name: tc.name,
                    arguments: tc.arguments,
                })
                .collect(),
        })
    }
}
