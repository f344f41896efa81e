//! Safety Validator — a second model call that vets a candidate reply.
//!
//! The verdict must be exactly `{"accepted": <bool>}`. Anything else, and
//! any gateway failure, counts as a rejection.

use std::sync::Arc;
use std::time::Duration;

use chatterbox_core::message::Message;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::gateway::ModelGateway;

pub const CHECK_PROMPT: &str = "\
You are a message-checking system for an AI chatbot.
Your purpose is to ensure that the messages the chatbot sends are not harmful, illegal, or offensive.
You also ensure that the message is actually a text message, and not random JSON tool calls.
Remember, the message is a chatbot message, so the only content should be a normal text message.

If the message is OK to send, respond with { \"accepted\": true }. Otherwise, respond with { \"accepted\": false }.
Respond only with valid JSON.";

#[derive(Debug, Deserialize)]
struct Verdict {
    accepted: bool,
}

/// Parse a verdict. `None` for anything that is not the expected shape.
pub fn parse_verdict(text: &str) -> Option<bool> {
    serde_json::from_str::<Verdict>(text.trim())
        .ok()
        .map(|v| v.accepted)
}

pub struct SafetyValidator {
    gateway: Arc<ModelGateway>,
    deadline: Option<Duration>,
}

impl SafetyValidator {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self {
            gateway,
            deadline: None,
        }
    }

    /// Bound the check call (unbounded by default).
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// One shot, no retries, fail closed.
    pub async fn is_acceptable(&self, candidate: &str) -> bool {
        let request = self.gateway.request(
            vec![Message::system(CHECK_PROMPT), Message::user(candidate)],
            Vec::new(),
        );

        let reply = match self.gateway.call(request, self.deadline).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Safety check call failed, rejecting candidate");
                return false;
            }
        };

        match parse_verdict(&reply.text) {
            Some(accepted) => {
                debug!(accepted, "Safety verdict");
                accepted
            }
            None => {
                warn!(verdict = %reply.text, "Unparseable safety verdict, rejecting candidate");
                false
            }
        }
    }
}
