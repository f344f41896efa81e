//! CLI channel — a terminal stand-in for a stream chat room.
//!
//! Reads lines from stdin and prints replies to stdout. A line of the form
//! `name: text` is posted as `name`; anything else is posted as the local
//! viewer. `/category <name>` and `/offline` drive the topic feed.

use async_trait::async_trait;
use chatterbox_core::channel::{Channel, ChannelId, ChannelMessage, ReplySink};
use chatterbox_core::error::ChannelError;
use chatterbox_core::topic::TopicUpdate;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::feed::ManualTopicFeed;

/// What one input line asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum LineAction {
    Exit,
    Skip,
    Topic(TopicUpdate),
    Chat { speaker: String, text: String },
}

/// Classify a raw input line.
pub fn parse_line(line: &str, default_speaker: &str) -> LineAction {
    let line = line.trim();
    if line.is_empty() {
        return LineAction::Skip;
    }

    if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
        return LineAction::Exit;
    }

    if line == "/offline" {
        return LineAction::Topic(TopicUpdate::offline());
    }

    if let Some(rest) = line.strip_prefix("/category") {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return LineAction::Topic(TopicUpdate::category(rest.trim()));
        }
    }

    // "name: text" where name looks like a chat login
    if let Some((name, text)) = line.split_once(':') {
        let name = name.trim();
        let is_login = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_login && !text.trim().is_empty() {
            return LineAction::Chat {
                speaker: name.to_string(),
                text: text.trim().to_string(),
            };
        }
    }

    LineAction::Chat {
        speaker: default_speaker.to_string(),
        text: line.to_string(),
    }
}

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
    room: String,
    viewer: String,
    bot_name: String,
    topic_feed: Option<Arc<ManualTopicFeed>>,
}

impl CliChannel {
    pub fn new(room: impl Into<String>, bot_name: impl Into<String>) -> Self {
        Self {
            id: ChannelId("cli".into()),
            room: room.into(),
            viewer: "viewer".into(),
            bot_name: bot_name.into(),
            topic_feed: None,
        }
    }

    /// Name used for lines without a `name:` prefix.
    pub fn with_viewer(mut self, viewer: impl Into<String>) -> Self {
        self.viewer = viewer.into();
        self
    }

    /// Route `/category` and `/offline` lines into `feed`.
    pub fn with_topic_feed(mut self, feed: Arc<ManualTopicFeed>) -> Self {
        self.topic_feed = Some(feed);
        self
    }
}

#[async_trait]
impl ReplySink for CliChannel {
    async fn send(&self, _chat_id: &str, content: &str) -> Result<(), ChannelError> {
        println!("{}: {content}", self.bot_name);
        Ok(())
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();
        let room = self.room.clone();
        let viewer = self.viewer.clone();
        let feed = self.topic_feed.clone();

        tokio::spawn(async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match parse_line(&line, &viewer) {
                        LineAction::Skip => continue,
                        LineAction::Exit => break,
                        LineAction::Topic(update) => match &feed {
                            Some(feed) => {
                                if let Err(e) = feed.push(update).await {
                                    warn!(error = %e, "Could not push topic update");
                                }
                            }
                            None => warn!("No topic feed attached; ignoring topic command"),
                        },
                        LineAction::Chat { speaker, text } => {
                            let msg = ChannelMessage {
                                channel_id: channel_id.clone(),
                                sender_name: speaker,
                                content: text,
                                chat_id: room.clone(),
                            };
                            if tx.send(Ok(msg)).await.is_err() {
                                break;
                            }
                        }
                    },
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }
}
