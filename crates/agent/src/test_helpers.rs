//! Shared test helpers for the turn pipeline.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chatterbox_core::channel::ReplySink;
use chatterbox_core::error::{ChannelError, ProviderError};
use chatterbox_core::message::{Message, MessageToolCall};
use chatterbox_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// One scripted provider behaviour.
#[derive(Clone)]
pub enum Step {
    Reply(ProviderResponse),
    Fail(ProviderError),
    /// Never answers.
    Stall,
    /// Answers after the given delay.
    Delayed(Duration, ProviderResponse),
}

impl Step {
    pub fn reply(response: ProviderResponse) -> Self {
        Step::Reply(response)
    }

    pub fn text(text: &str) -> Self {
        Step::Reply(text_response(text))
    }
}

/// A provider that plays back a script and records every request.
///
/// Panics if more calls are made than steps provided.
pub struct ScriptedProvider {
    steps: Mutex<Vec<Step>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let step = {
            let mut requests = self.requests.lock().unwrap();
            let steps = self.steps.lock().unwrap();
            let index = requests.len();
            requests.push(request);
            steps
                .get(index)
                .cloned()
                .unwrap_or_else(|| panic!("ScriptedProvider: no step for call #{index}"))
        };

        match step {
            Step::Reply(response) => Ok(response),
            Step::Fail(error) => Err(error),
            Step::Stall => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(ProviderError::Network("stalled call finished".into()))
            }
            Step::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
        }
    }
}

/// A plain text response (no tool calls).
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "scripted-model".into(),
    }
}

/// A response requesting the given tools, in order.
pub fn tool_call_response(calls: &[(&str, serde_json::Value)]) -> ProviderResponse {
    let mut message = Message::assistant("");
    message.tool_calls = calls
        .iter()
        .enumerate()
        .map(|(i, (name, arguments))| MessageToolCall {
            id: format!("call_{i}"),
            name: (*name).to_string(),
            arguments: arguments.clone(),
        })
        .collect();
    ProviderResponse {
        message,
        usage: None,
        model: "scripted-model".into(),
    }
}

/// The validator's verdict text.
pub fn verdict(accepted: bool) -> Step {
    Step::text(&format!("{{\"accepted\": {accepted}}}"))
}

/// A reply sink that records what it was asked to send.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, chat_id: &str, content: &str) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), content.to_string()));
        if self.fail {
            return Err(ChannelError::DeliveryFailed {
                channel: chat_id.to_string(),
                reason: "sink closed".into(),
            });
        }
        Ok(())
    }
}
