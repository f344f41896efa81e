//! Channel trait — the abstraction over chat transports.
//!
//! A Channel connects Chatterbox to a chat room (a stream chat, a terminal,
//! a test harness). It yields inbound messages and sends replies back.
//! Only the reply half is needed by the turn pipeline, so it is split out as
//! [`ReplySink`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The channel this message belongs to
    pub channel_id: ChannelId,

    /// Display name of the chatter
    pub sender_name: String,

    /// The raw text, command prefix included
    pub content: String,

    /// The room the message was posted in
    pub chat_id: String,
}

/// Outbound half of a channel: deliver one text to one room.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, chat_id: &str, content: &str) -> std::result::Result<(), ChannelError>;
}

/// The core Channel trait.
///
/// Implementations handle transport-specific connection logic and message
/// formatting.
#[async_trait]
pub trait Channel: ReplySink {
    /// Human-readable channel name (e.g., "cli", "twitch").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Start listening for incoming messages.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }
}
