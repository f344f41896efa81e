//! History store implementations for Chatterbox.

pub mod file_history;
pub mod in_memory;

pub use file_history::JsonFileHistory;
pub use in_memory::InMemoryHistory;
