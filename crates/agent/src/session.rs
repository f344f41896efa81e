//! Per-conversation state shared by the orchestrator and the topic reactor.
//!
//! History has one writer at a time (the turn holding the admission gate).
//! The topic is read through a [`TopicReader`]; only the reactor writes it.

use std::sync::atomic::{AtomicU64, Ordering};

use chatterbox_config::BotConfig;
use chatterbox_core::history::{History, Turn};
use chatterbox_core::topic::{Topic, TopicReader};
use tokio::sync::RwLock;

/// Who the bot is and where it talks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// The bot's display name (also its speaker label in history)
    pub bot_name: String,
    /// Whose stream the topic describes
    pub streamer_name: String,
    /// The room replies and notifications go to
    pub channel: String,
}

impl BotIdentity {
    pub fn new(
        bot_name: impl Into<String>,
        streamer_name: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            bot_name: bot_name.into(),
            streamer_name: streamer_name.into(),
            channel: channel.into(),
        }
    }

    pub fn from_config(bot: &BotConfig) -> Self {
        Self::new(&bot.bot_name, bot.streamer(), &bot.channel_name)
    }
}

/// The state of one conversation.
pub struct Session {
    identity: BotIdentity,
    history: RwLock<History>,
    topic: TopicReader,
    generation: AtomicU64,
}

impl Session {
    pub fn new(identity: BotIdentity, history: History, topic: TopicReader) -> Self {
        Self {
            identity,
            history: RwLock::new(history),
            topic,
            generation: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// The topic as of now. One call is one consistent read.
    pub fn topic(&self) -> Topic {
        self.topic.current()
    }

    /// Append a turn, dropping the oldest ones past the cap.
    pub async fn append(&self, turn: Turn) {
        let dropped = self.history.write().await.push(turn);
        if dropped > 0 {
            tracing::debug!(dropped, "History window full, oldest turns dropped");
        }
    }

    /// Append several turns in order under one lock.
    pub async fn append_all(&self, turns: Vec<Turn>) {
        let mut history = self.history.write().await;
        for turn in turns {
            history.push(turn);
        }
    }

    pub async fn history_snapshot(&self) -> Vec<Turn> {
        self.history.read().await.snapshot()
    }

    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }

    /// Record that the system context was re-rendered. Returns the new generation.
    pub fn bump_context_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// How many times the system context has been regenerated.
    pub fn context_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
