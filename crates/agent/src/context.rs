//! System context rendering.
//!
//! The system text is a pure function of the bot identity, the topic label,
//! and a history snapshot. It is rendered fresh before every model call and
//! whenever the topic changes; nothing here caches.

use chatterbox_core::history::{Turn, render_transcript};
use chatterbox_core::topic::Topic;

use crate::session::{BotIdentity, Session};

/// The built-in system prompt.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are {bot_name}, a chatbot on a live stream alongside your host.
You are a helpful assistant that chats with the stream chat and answers questions about the streamer's game.
Respond to the recent messages in the chat history with your reply text only.
Do not respond with anything other than your text reply.

The streamer's name is {streamer_name}.
The current game is {current_category}. If the stream is offline, feel free to chat still.

Example chat:
    viewer123: Hello bot!
    {bot_name}: Hi there! Welcome to the stream! What game are you watching today?
    viewer123: {streamer_name} is playing {current_category} today.

DO NOT use any tool calls unless necessary. ONLY use tool calls when a user specifically asks. DO NOT search the internet unnecessarily.

The conversation history is as follows:
{chat_history}";

/// Substitute `{name}` placeholders in one pass.
///
/// Unknown placeholders are kept verbatim, and substituted values are never
/// scanned again, so chat text containing braces cannot inject variables.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['}', '{']) {
            Some(close) if after.as_bytes()[close] == b'}' => {
                let key = &after[..close];
                match vars.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Renders the system instruction from a template.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    template: String,
}

impl ContextBuilder {
    /// Use `template`, or the built-in prompt when `None`.
    pub fn new(template: Option<String>) -> Self {
        Self {
            template: template
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string()),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn render(&self, identity: &BotIdentity, topic: &Topic, history: &[Turn]) -> String {
        let transcript = render_transcript(history);
        render_template(
            &self.template,
            &[
                ("bot_name", identity.bot_name.as_str()),
                ("streamer_name", identity.streamer_name.as_str()),
                ("current_category", topic.label()),
                ("chat_history", transcript.as_str()),
            ],
        )
    }

    /// Render against the session's current topic and history.
    pub async fn render_for(&self, session: &Session) -> String {
        let topic = session.topic();
        let history = session.history_snapshot().await;
        self.render(session.identity(), &topic, &history)
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(None)
    }
}
