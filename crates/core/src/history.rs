//! Conversation history — a bounded, chronological window of turns.
//!
//! The window only ever grows at the tail; once it holds more than its cap,
//! the oldest turns fall off the front.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::HistoryError;
use crate::message::{Message, Role};

/// Default number of turns kept in the window.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Who produced a turn. System instructions are never part of history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    Tool,
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
            TurnRole::Tool => Role::Tool,
        }
    }
}

/// One message unit in the conversation.
///
/// The persisted form is `{"role": ..., "content": ...}`; `speaker` is only
/// written when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl Turn {
    /// A chat participant's message, rendered as `"{speaker}: {text}"`.
    pub fn user(speaker: impl Into<String>, text: &str) -> Self {
        let speaker = speaker.into();
        Self {
            role: TurnRole::User,
            content: format!("{speaker}: {text}"),
            speaker: Some(speaker),
        }
    }

    /// The bot's own reply, rendered as `"{bot_name}: {text}"`.
    pub fn assistant(bot_name: impl Into<String>, text: &str) -> Self {
        let bot_name = bot_name.into();
        Self {
            role: TurnRole::Assistant,
            content: format!("{bot_name}: {text}"),
            speaker: Some(bot_name),
        }
    }

    /// The textual outcome of a tool invocation.
    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Tool,
            content: content.into(),
            speaker: None,
        }
    }

    /// Convert to a provider message.
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role.into(),
            content: self.content.clone(),
            tool_calls: Vec::new(),
        }
    }
}

/// A sliding window of at most `cap` turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    turns: VecDeque<Turn>,
    cap: usize,
}

impl History {
    /// Create an empty history with the given cap (at least 1).
    pub fn new(cap: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    /// Build a history from previously saved turns, keeping the newest `cap`.
    pub fn from_turns(turns: Vec<Turn>, cap: usize) -> Self {
        let mut history = Self {
            turns: turns.into(),
            cap: cap.max(1),
        };
        history.truncate_to_cap();
        history
    }

    /// Append a turn and enforce the cap. Returns how many old turns fell off.
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push_back(turn);
        self.truncate_to_cap()
    }

    fn truncate_to_cap(&mut self) -> usize {
        let overflow = self.turns.len().saturating_sub(self.cap);
        self.turns.drain(..overflow);
        overflow
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Copy of the current window, oldest first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

/// Render turns as a plain-text transcript, one `[role] content` line each.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| {
            let role = Role::from(t.role);
            format!("[{}] {}", role.as_str(), t.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// External load/save of the conversation window.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Human-readable backend name (e.g., "json_file").
    fn name(&self) -> &str;

    /// Load the saved turns, oldest first.
    async fn load(&self) -> Result<Vec<Turn>, HistoryError>;

    /// Replace the saved turns with `turns`.
    async fn save(&self, turns: &[Turn]) -> Result<(), HistoryError>;

    /// Drop everything saved.
    async fn clear(&self) -> Result<(), HistoryError> {
        self.save(&[]).await
    }
}

/// Load from `store`, degrading any failure to an empty window.
pub async fn load_or_empty(store: &dyn HistoryStore) -> Vec<Turn> {
    match store.load().await {
        Ok(turns) => turns,
        Err(e) => {
            warn!(store = store.name(), error = %e, "Could not load chat history, starting empty");
            Vec::new()
        }
    }
}
