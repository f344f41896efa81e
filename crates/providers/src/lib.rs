//! LLM Provider implementations for Chatterbox.
//!
//! All providers implement the `chatterbox_core::Provider` trait.
//! [`build_from_config`] selects the backend named in configuration.

pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
