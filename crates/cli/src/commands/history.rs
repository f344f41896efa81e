//! `chatterbox history` — Inspect or reset the saved chat history.

use chatterbox_config::AppConfig;
use chatterbox_core::history::{HistoryStore, render_transcript};
use chatterbox_memory::JsonFileHistory;

pub async fn show(config: &AppConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileHistory::new(&config.history.path);
    let turns = store.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    println!("History: {} ({} turns)", store.path().display(), turns.len());
    if turns.is_empty() {
        println!("  (empty)");
    } else {
        println!();
        println!("{}", render_transcript(&turns));
    }
    Ok(())
}

pub async fn clear(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileHistory::new(&config.history.path);
    store.clear().await?;
    println!("Cleared chat history at {}", store.path().display());
    Ok(())
}
