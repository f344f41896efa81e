//! The turn pipeline — the heart of Chatterbox.
//!
//! Each addressed chat message runs one **turn**:
//!
//! 1. **Admit** the message if it starts with the command prefix
//! 2. **Build context** (system prompt + live topic + history transcript)
//! 3. **Call the model** via the configured provider, under a deadline
//! 4. **If tool calls**: dispatch them in order, then ask the model once more without tools
//! 5. **Validate** the candidate with a second model call
//! 6. **Reply** with the candidate, or with a fixed fallback sentence
//!
//! Alongside, the [`TopicReactor`] follows the stream's category feed and
//! regenerates the system context whenever the topic changes.

pub mod context;
pub mod dispatch;
pub mod gateway;
pub mod orchestrator;
pub mod reactor;
pub mod session;
pub mod validator;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{ContextBuilder, DEFAULT_PROMPT_TEMPLATE, render_template};
pub use dispatch::{DispatchOutcome, ToolDispatcher};
pub use gateway::{GatewayReply, ModelGateway};
pub use orchestrator::{Fallback, TurnOrchestrator, strip_bot_label, strip_command_prefix};
pub use reactor::TopicReactor;
pub use session::{BotIdentity, Session};
pub use validator::SafetyValidator;
pub use worker::{ConversationWorker, WorkerStats};
