//! Manual topic feed — category updates pushed by hand.
//!
//! Stands in for a stream platform's "channel updated" subscription. The
//! terminal channel pushes into it on `/category` and `/offline`; tests push
//! into it directly.

use async_trait::async_trait;
use chatterbox_core::error::ChannelError;
use chatterbox_core::topic::{TopicFeed, TopicUpdate};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

pub struct ManualTopicFeed {
    latest: Mutex<Option<TopicUpdate>>,
    tx: mpsc::Sender<TopicUpdate>,
    rx: Mutex<Option<mpsc::Receiver<TopicUpdate>>>,
}

impl ManualTopicFeed {
    /// Create a feed. `initial` is what the startup lookup reports; `None`
    /// makes that lookup fail.
    pub fn new(initial: Option<TopicUpdate>) -> Self {
        let (tx, rx) = mpsc::channel(32);
        Self {
            latest: Mutex::new(initial),
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Publish an update to the subscriber.
    pub async fn push(&self, update: TopicUpdate) -> Result<(), ChannelError> {
        debug!(category = ?update.category_name, "Topic update pushed");
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(update.clone());
        }
        self.tx
            .send(update)
            .await
            .map_err(|_| ChannelError::FeedUnavailable("topic subscriber has gone away".into()))
    }
}

impl Default for ManualTopicFeed {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl TopicFeed for ManualTopicFeed {
    fn name(&self) -> &str {
        "manual"
    }

    async fn current(&self) -> Result<TopicUpdate, ChannelError> {
        self.latest
            .lock()
            .ok()
            .and_then(|latest| latest.clone())
            .ok_or_else(|| ChannelError::FeedUnavailable("no category has been reported yet".into()))
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<TopicUpdate>, ChannelError> {
        self.rx
            .lock()
            .ok()
            .and_then(|mut rx| rx.take())
            .ok_or_else(|| ChannelError::FeedUnavailable("feed already has a subscriber".into()))
    }
}
