//! Configuration loading, validation, and management for Chatterbox.
//!
//! Loads configuration from `~/.chatterbox/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bot identity and turn pipeline settings
    #[serde(default)]
    pub bot: BotConfig,

    /// Model backend settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Prompt and notification templates
    #[serde(default)]
    pub templates: TemplateConfig,

    /// Chat history persistence
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Only messages starting with this prefix are answered
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Maximum number of turns kept in history
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Hard deadline for the first model call of a turn
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Optional deadline for the tool re-pass and the safety check.
    /// Unset means those calls are unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup_timeout_secs: Option<u64>,

    /// The bot's display name in chat
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// The chat room to join and reply in
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Whose stream the topic is read from (defaults to `channel_name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streamer_name: Option<String>,
}

fn default_command_prefix() -> String {
    "!ai".into()
}
fn default_max_history() -> usize {
    100
}
fn default_response_timeout_secs() -> u64 {
    30
}
fn default_bot_name() -> String {
    "SLM_Bot".into()
}
fn default_channel_name() -> String {
    "chatterbox".into()
}

impl BotConfig {
    /// The streamer identity, falling back to the channel name.
    pub fn streamer(&self) -> &str {
        self.streamer_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.channel_name)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn followup_timeout(&self) -> Option<Duration> {
        self.followup_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            max_history: default_max_history(),
            response_timeout_secs: default_response_timeout_secs(),
            followup_timeout_secs: None,
            bot_name: default_bot_name(),
            channel_name: default_channel_name(),
            streamer_name: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend kind: "ollama" or "openai"
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key (OpenAI-compatible backends only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_provider_kind() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "llama3.2:3b-instruct-q4_0".into()
}
fn default_temperature() -> f32 {
    0.2
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            api_url: None,
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Custom system prompt. Placeholders: `{bot_name}`, `{streamer_name}`,
    /// `{current_category}`, `{chat_history}`. Unset = built-in prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Sent when the category changes. Placeholders: `{old_category}`,
    /// `{new_category}`, `{streamer_name}`. Empty = no notification.
    #[serde(default = "default_category_changed")]
    pub category_changed: String,

    /// Sent when the category becomes empty. Placeholder: `{streamer_name}`.
    #[serde(default = "default_empty_category")]
    pub empty_category: String,
}

fn default_category_changed() -> String {
    "Category changed from {old_category} to {new_category}!".into()
}
fn default_empty_category() -> String {
    "{streamer_name} is not in a category right now. Feel free to keep chatting!".into()
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            prompt: None,
            category_changed: default_category_changed(),
            empty_category: default_empty_category(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Where the history JSON file lives
    #[serde(default = "default_history_path")]
    pub path: PathBuf,

    /// Save after every turn and load at startup
    #[serde(default = "default_true")]
    pub persist: bool,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("./chat_logs/history.json")
}
fn default_true() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            persist: true,
        }
    }
}

/// Append `.json` to a history path that lacks it.
pub fn normalize_history_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "json") {
        path.to_path_buf()
    } else {
        let mut os = path.as_os_str().to_owned();
        os.push(".json");
        PathBuf::from(os)
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatterbox/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `CHATTERBOX_MODEL`
    /// - `CHATTERBOX_API_KEY`
    /// - `CHATTERBOX_PROVIDER_URL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific file path, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("CHATTERBOX_MODEL") {
            self.provider.model = model;
        }
        if let Some(key) = lookup("CHATTERBOX_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = lookup("CHATTERBOX_PROVIDER_URL") {
            self.provider.api_url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatterbox")
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.bot.command_prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bot.command_prefix must not be empty".into(),
            ));
        }

        if self.bot.max_history < 2 {
            return Err(ConfigError::ValidationError(
                "bot.max_history must hold at least one exchange (>= 2)".into(),
            ));
        }

        if self.bot.response_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "bot.response_timeout_secs must be > 0".into(),
            ));
        }

        if self.bot.followup_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "bot.followup_timeout_secs must be > 0 when set".into(),
            ));
        }

        if !matches!(self.provider.kind.as_str(), "ollama" | "openai") {
            return Err(ConfigError::ValidationError(format!(
                "unknown provider.kind '{}' (expected \"ollama\" or \"openai\")",
                self.provider.kind
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
