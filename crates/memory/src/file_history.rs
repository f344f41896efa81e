//! File-based history store: one pretty-printed JSON array of turns.
//!
//! Each element is `{"role": ..., "content": ...}`. The file is rewritten
//! in full on every save through a sibling temp file, so a crash mid-write
//! leaves the previous window intact.

use async_trait::async_trait;
use chatterbox_core::error::HistoryError;
use chatterbox_core::history::{HistoryStore, Turn};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A history store backed by a JSON file.
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse a saved window. Any entry that is not a turn rejects the whole file.
    fn parse(content: &str) -> Result<Vec<Turn>, HistoryError> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(content)
            .map_err(|e| HistoryError::Malformed(format!("expected a JSON array of turns: {e}")))
    }

    fn temp_path(&self) -> PathBuf {
        let mut os = self.path.as_os_str().to_owned();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistory {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn load(&self) -> Result<Vec<Turn>, HistoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No history file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(HistoryError::Storage(format!(
                    "Failed to read history file {}: {e}",
                    self.path.display()
                )));
            }
        };

        let turns = Self::parse(&content)?;
        debug!(path = %self.path.display(), count = turns.len(), "History loaded");
        Ok(turns)
    }

    async fn save(&self, turns: &[Turn]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                HistoryError::Storage(format!("Failed to create history directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(turns)
            .map_err(|e| HistoryError::Storage(format!("Failed to serialize history: {e}")))?;

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to write history file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to replace history file: {e}")))?;

        debug!(path = %self.path.display(), count = turns.len(), "History saved");
        Ok(())
    }
}
