//! Built-in tool implementations for Chatterbox.
//!
//! The bot offers the model exactly three capabilities, in this order:
//! declining to use a tool, searching the web, and reading the clock.

pub mod clock;
pub mod respond;
pub mod web_search;

use chatterbox_core::tool::ToolRegistry;

pub use clock::CurrentTimeTool;
pub use respond::RespondToUserTool;
pub use web_search::{DuckDuckGoSearch, SearchBackend, SearchHit, WebSearchTool};

/// Create the default tool registry around the given search backend.
pub fn default_registry(search: Box<dyn SearchBackend>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(RespondToUserTool));
    registry.register(Box::new(WebSearchTool::new(search)));
    registry.register(Box::new(CurrentTimeTool::new()));
    registry
}
