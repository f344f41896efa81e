//! The turn orchestrator — one full request/response cycle per message.
//!
//! 1. **Admit** a prefixed message (one turn in flight at a time)
//! 2. **Call the model** with fresh context and all tool declarations, under a deadline
//! 3. **Dispatch** requested tools in order, folding outcomes into history
//! 4. **Re-ask** the model without tools if any tool ran
//! 5. **Clean and validate** the candidate, falling back on any failure
//! 6. **Record and send** exactly one reply
//!
//! Nothing on this path is fatal: every failure maps to a fallback sentence.

use std::sync::Arc;
use std::time::Duration;

use chatterbox_core::channel::ReplySink;
use chatterbox_core::error::GatewayError;
use chatterbox_core::event::{DomainEvent, EventBus};
use chatterbox_core::history::{HistoryStore, Turn};
use chatterbox_core::tool::ToolRegistry;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::context::ContextBuilder;
use crate::dispatch::ToolDispatcher;
use crate::gateway::{GatewayReply, ModelGateway};
use crate::session::Session;
use crate::validator::SafetyValidator;

pub const DEFAULT_COMMAND_PREFIX: &str = "!ai";
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// The fixed sentences sent when no validated reply could be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The first model call hit its deadline
    Timeout,
    /// The model backend failed
    Backend,
    /// The reply was empty or did not pass the safety check
    Processing,
}

impl Fallback {
    pub fn sentence(self) -> &'static str {
        match self {
            Fallback::Timeout => "Sorry, the generation took too long. Please try again later.",
            Fallback::Backend => "There was an error connecting to the LLM. Please try again later.",
            Fallback::Processing => {
                "There was an error processing your request. Please try again later."
            }
        }
    }

    fn for_gateway_error(error: &GatewayError) -> Self {
        if error.is_deadline() {
            Fallback::Timeout
        } else {
            Fallback::Backend
        }
    }
}

/// The text following `prefix`, if `raw` is addressed to the bot.
///
/// The prefix must be followed by whitespace or end the message, so `!aim`
/// is not a command for `!ai`.
pub fn strip_command_prefix<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = raw.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Remove a `"{bot_name}:"` label the model echoed at the start of any line.
pub fn strip_bot_label(text: &str, bot_name: &str) -> String {
    let label = format!("{bot_name}:");
    text.lines()
        .map(|line| line.strip_prefix(label.as_str()).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub struct TurnOrchestrator {
    session: Arc<Session>,
    context: ContextBuilder,
    gateway: Arc<ModelGateway>,
    dispatcher: ToolDispatcher,
    validator: SafetyValidator,
    sink: Arc<dyn ReplySink>,
    store: Option<Arc<dyn HistoryStore>>,
    events: Arc<EventBus>,
    prefix: String,
    deadline: Duration,
    followup_deadline: Option<Duration>,
    gate: Mutex<()>,
}

impl TurnOrchestrator {
    pub fn new(
        session: Arc<Session>,
        gateway: Arc<ModelGateway>,
        tools: Arc<ToolRegistry>,
        sink: Arc<dyn ReplySink>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            session,
            context: ContextBuilder::default(),
            dispatcher: ToolDispatcher::new(tools, events.clone()),
            validator: SafetyValidator::new(gateway.clone()),
            gateway,
            sink,
            store: None,
            events,
            prefix: DEFAULT_COMMAND_PREFIX.into(),
            deadline: DEFAULT_RESPONSE_TIMEOUT,
            followup_deadline: None,
            gate: Mutex::new(()),
        }
    }

    pub fn with_context_builder(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Deadline for the first model call of each turn.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Deadline for the tool re-pass and the safety check (unbounded if `None`).
    pub fn with_followup_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.followup_deadline = deadline;
        self.validator = self.validator.with_deadline(deadline);
        self
    }

    /// Save history here after every turn.
    pub fn with_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Process one inbound message.
    ///
    /// Returns the reply that was emitted, or `None` when the message was
    /// not addressed to the bot (no state change, no reply).
    pub async fn handle_turn(&self, speaker: &str, raw_text: &str) -> Option<String> {
        let text = strip_command_prefix(raw_text, &self.prefix)?;

        // Queued turns are admitted in arrival order.
        let _turn = self.gate.lock().await;
        let bot_name = self.session.identity().bot_name.clone();

        info!(speaker, text, context_generation = self.session.context_generation(), "Handling turn");
        self.events.publish(DomainEvent::MessageReceived {
            speaker: speaker.to_string(),
            content_preview: text.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        self.session.append(Turn::user(speaker, text)).await;

        let (reply, fallback) = match self.generate().await {
            Ok(candidate) => self.vet(candidate, &bot_name).await,
            Err(fallback) => (fallback.sentence().to_string(), Some(fallback)),
        };

        if let Some(kind) = fallback {
            info!(?kind, "Replying with fallback");
        }

        self.session.append(Turn::assistant(&bot_name, &reply)).await;

        let channel = &self.session.identity().channel;
        let delivered = match self.sink.send(channel, &reply).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Reply delivery failed");
                self.events.publish(DomainEvent::ErrorOccurred {
                    context: "reply_sink".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                false
            }
        };

        self.events.publish(DomainEvent::ReplySent {
            fallback: fallback.is_some(),
            delivered,
            timestamp: Utc::now(),
        });

        self.persist().await;
        Some(reply)
    }

    /// Steps 2 to 4: the model's candidate text, or the fallback to use.
    async fn generate(&self) -> Result<String, Fallback> {
        let system = self.context.render_for(&self.session).await;
        let turns = self.session.history_snapshot().await;
        let request = self.gateway.conversation_request(
            &system,
            &turns,
            self.dispatcher.registry().definitions(),
        );

        let first: GatewayReply = self
            .gateway
            .call(request, Some(self.deadline))
            .await
            .map_err(|e| {
                warn!(error = %e, "Model call failed");
                Fallback::for_gateway_error(&e)
            })?;

        if first.tool_requests.is_empty() {
            return Ok(first.text);
        }

        let outcome = self.dispatcher.dispatch(&first.tool_requests).await;
        if outcome.dispatched() == 0 {
            debug!(skipped = outcome.skipped, "No known tools requested");
            return Ok(first.text);
        }
        self.session.append_all(outcome.turns).await;

        // Second pass sees the tool turns and may not request more tools.
        let system = self.context.render_for(&self.session).await;
        let turns = self.session.history_snapshot().await;
        let request = self.gateway.conversation_request(&system, &turns, Vec::new());

        let second = self
            .gateway
            .call(request, self.followup_deadline)
            .await
            .map_err(|e| {
                warn!(error = %e, "Follow-up model call failed");
                Fallback::for_gateway_error(&e)
            })?;

        Ok(second.text)
    }

    /// Steps 5 to 7: clean the candidate and run the safety check.
    async fn vet(&self, candidate: String, bot_name: &str) -> (String, Option<Fallback>) {
        if candidate.trim().is_empty() {
            return (Fallback::Processing.sentence().to_string(), Some(Fallback::Processing));
        }

        let cleaned = strip_bot_label(&candidate, bot_name);
        if cleaned.is_empty() {
            return (Fallback::Processing.sentence().to_string(), Some(Fallback::Processing));
        }

        if !self.validator.is_acceptable(&cleaned).await {
            return (Fallback::Processing.sentence().to_string(), Some(Fallback::Processing));
        }

        (cleaned, None)
    }

    /// Save the current window, if a store is attached. Failures are logged.
    pub async fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let turns = self.session.history_snapshot().await;
        if let Err(e) = store.save(&turns).await {
            warn!(store = store.name(), error = %e, "Failed to save chat history");
            self.events.publish(DomainEvent::ErrorOccurred {
                context: "history_store".into(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}
