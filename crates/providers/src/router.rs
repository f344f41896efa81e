//! Provider selection from configuration.

use std::sync::Arc;

use chatterbox_config::ProviderConfig;
use chatterbox_core::error::ProviderError;
use chatterbox_core::provider::Provider;
use tracing::info;

use crate::ollama::OllamaProvider;
use crate::openai_compat::{DEFAULT_OPENAI_URL, OpenAiCompatProvider};

/// Build the configured model backend.
pub fn build_from_config(config: &ProviderConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider: Arc<dyn Provider> = match config.kind.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(config.api_url.as_deref())?),
        "openai" => {
            let base_url = config.api_url.as_deref().unwrap_or(DEFAULT_OPENAI_URL);
            let api_key = config.api_key.clone().unwrap_or_default();
            Arc::new(OpenAiCompatProvider::new("openai", base_url, api_key)?)
        }
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider kind '{other}'"
            )));
        }
    };

    info!(provider = provider.name(), model = %config.model, "Model backend configured");
    Ok(provider)
}
