//! Tool dispatch — run the model's tool requests one after another.
//!
//! Each request that names a registered tool yields exactly one `tool`
//! turn: the tool's summary on success, or the error text on failure.
//! Requests for unknown tools are skipped and leave no trace in history.

use std::sync::Arc;
use std::time::Instant;

use chatterbox_core::event::{DomainEvent, EventBus};
use chatterbox_core::history::Turn;
use chatterbox_core::tool::{ToolCall, ToolRegistry};
use chrono::Utc;
use tracing::{debug, info, warn};

/// The outcome of dispatching one batch of requests.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// One `tool` turn per dispatched request, in request order
    pub turns: Vec<Turn>,
    /// Requests naming no registered tool
    pub skipped: usize,
}

impl DispatchOutcome {
    pub fn dispatched(&self) -> usize {
        self.turns.len()
    }
}

pub struct ToolDispatcher {
    tools: Arc<ToolRegistry>,
    events: Arc<EventBus>,
}

impl ToolDispatcher {
    pub fn new(tools: Arc<ToolRegistry>, events: Arc<EventBus>) -> Self {
        Self { tools, events }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run `requests` strictly in order, awaiting each before the next.
    pub async fn dispatch(&self, requests: &[ToolCall]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for call in requests {
            let Some(tool) = self.tools.get(&call.name) else {
                debug!(tool = %call.name, "Model requested an unknown tool, skipping");
                outcome.skipped += 1;
                continue;
            };

            let start = Instant::now();
            let result = tool.execute(call.arguments.clone()).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let summary = match &result {
                Ok(output) => {
                    info!(tool = %call.name, duration_ms, "Tool executed");
                    tool.summarize(output)
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool execution failed");
                    format!("Tool {} returned an error: {e}", call.name)
                }
            };

            self.events.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success: result.is_ok(),
                duration_ms,
                timestamp: Utc::now(),
            });

            outcome.turns.push(Turn::tool(summary));
        }

        outcome
    }
}
