//! Topic state — the live "what is the stream about" label.
//!
//! The label conditions the system prompt. It has exactly one writer (the
//! topic reactor) and any number of readers. Readers always observe a whole
//! value: a render that started before a change keeps the old label.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::error::ChannelError;

/// Label used while no category signal has been seen yet.
pub const UNRESOLVED_LABEL: &str = "unknown";

/// Label used when the feed reports an empty category (stream offline).
pub const OFFLINE_LABEL: &str = "[No Stream Category]";

/// The current topic of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Topic {
    /// No signal observed yet.
    #[default]
    Unresolved,
    /// A named category (e.g., the game being played).
    Category(String),
    /// The feed reported no category at all.
    Offline,
}

impl Topic {
    pub fn label(&self) -> &str {
        match self {
            Topic::Unresolved => UNRESOLVED_LABEL,
            Topic::Category(name) => name,
            Topic::Offline => OFFLINE_LABEL,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One event from the external update feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicUpdate {
    /// The reported category; missing or blank means offline.
    #[serde(default)]
    pub category_name: Option<String>,
}

impl TopicUpdate {
    pub fn category(name: impl Into<String>) -> Self {
        Self {
            category_name: Some(name.into()),
        }
    }

    pub fn offline() -> Self {
        Self { category_name: None }
    }

    /// The topic this update reports.
    pub fn into_topic(self) -> Topic {
        match self.category_name {
            Some(name) if !name.trim().is_empty() => Topic::Category(name.trim().to_string()),
            _ => Topic::Offline,
        }
    }
}

/// A push feed of topic updates (e.g., a stream-update event subscription).
#[async_trait]
pub trait TopicFeed: Send + Sync {
    /// Human-readable feed name.
    fn name(&self) -> &str;

    /// Look up the category right now (used once, at startup).
    async fn current(&self) -> Result<TopicUpdate, ChannelError>;

    /// Start receiving updates as they happen.
    async fn subscribe(&self) -> Result<mpsc::Receiver<TopicUpdate>, ChannelError>;
}

/// Create the topic state: one writer, cloneable readers. Starts Unresolved.
pub fn topic_state() -> (TopicWriter, TopicReader) {
    let (tx, rx) = watch::channel(Topic::Unresolved);
    (TopicWriter { tx }, TopicReader { rx })
}

/// The single writer of the topic state.
#[derive(Debug)]
pub struct TopicWriter {
    tx: watch::Sender<Topic>,
}

impl TopicWriter {
    /// Store `topic` if it differs from the current one.
    ///
    /// Returns the previous topic when a change happened, `None` otherwise.
    pub fn set(&self, topic: Topic) -> Option<Topic> {
        let mut previous = None;
        self.tx.send_if_modified(|current| {
            if *current == topic {
                false
            } else {
                previous = Some(std::mem::replace(current, topic));
                true
            }
        });
        previous
    }

    pub fn current(&self) -> Topic {
        self.tx.borrow().clone()
    }
}

/// A read-only handle to the topic state.
#[derive(Debug, Clone)]
pub struct TopicReader {
    rx: watch::Receiver<Topic>,
}

impl TopicReader {
    /// A consistent copy of the current topic.
    pub fn current(&self) -> Topic {
        self.rx.borrow().clone()
    }
}
