//! In-memory history store, for tests and `persist = false` runs.

use async_trait::async_trait;
use chatterbox_core::error::HistoryError;
use chatterbox_core::history::{HistoryStore, Turn};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Keeps the last saved window in memory and counts saves.
#[derive(Default)]
pub struct InMemoryHistory {
    turns: RwLock<Vec<Turn>>,
    saves: AtomicUsize,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a previously saved window.
    pub fn with_turns(turns: Vec<Turn>) -> Self {
        Self {
            turns: RwLock::new(turns),
            saves: AtomicUsize::new(0),
        }
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn saved(&self) -> Vec<Turn> {
        self.turns.read().await.clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self) -> Result<Vec<Turn>, HistoryError> {
        Ok(self.turns.read().await.clone())
    }

    async fn save(&self, turns: &[Turn]) -> Result<(), HistoryError> {
        *self.turns.write().await = turns.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
