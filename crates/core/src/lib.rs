//! # Chatterbox Core
//!
//! Domain types, traits, and error definitions for the Chatterbox stream chat
//! bot. This crate has **no framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the turn pipeline is a trait here (model backend,
//! tools, reply sink, topic feed, history store). Implementations live in
//! their respective crates, so tests can swap in scripted stand-ins.

pub mod error;
pub mod message;
pub mod history;
pub mod provider;
pub mod channel;
pub mod tool;
pub mod topic;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use message::{Message, MessageToolCall, Role};
pub use history::{History, HistoryStore, Turn, TurnRole};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use channel::{Channel, ChannelId, ChannelMessage, ReplySink};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
pub use topic::{Topic, TopicFeed, TopicReader, TopicUpdate, TopicWriter};
pub use event::{DomainEvent, EventBus};
