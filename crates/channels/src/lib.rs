//! Chat channel implementations for Chatterbox.
//!
//! Available channels:
//! - **CLI** — Interactive terminal chat (stdin/stdout)
//! - **Manual feed** — Topic updates pushed by hand or by tests

pub mod cli;
pub mod feed;

pub use cli::CliChannel;
pub use feed::ManualTopicFeed;
