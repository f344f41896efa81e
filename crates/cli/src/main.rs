//! Chatterbox CLI — the main entry point.
//!
//! Commands:
//! - `run`      — Chat with the bot from the terminal
//! - `history`  — Show or clear the saved chat history
//! - `config`   — Show, validate, or create the configuration file

use std::path::PathBuf;

use chatterbox_config::{AppConfig, ConfigError, normalize_history_path};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "chatterbox",
    about = "Chatterbox — an LLM chat bot for live stream chat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.chatterbox/config.toml)
    #[arg(long, global = true, env = "CHATTERBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Chat history file (".json" is appended if missing)
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Model name override
    #[arg(long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the bot from the terminal
    Run {
        /// Name used for lines typed without a "name:" prefix
        #[arg(long, default_value = "viewer")]
        viewer: String,

        /// Category the stream starts in
        #[arg(long)]
        category: Option<String>,
    },

    /// Inspect or reset the saved chat history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print the saved turns
    Show {
        /// Print raw JSON instead of a transcript
        #[arg(long)]
        json: bool,
    },
    /// Delete every saved turn
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Check the configuration file for errors
    Validate,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(AppConfig::default_path)
    }

    /// Load the config file and apply command-line overrides.
    fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::load_from(&self.config_path())?;
        if let Some(model) = &self.model {
            config.provider.model = model.clone();
        }
        if let Some(history) = &self.history {
            config.history.path = history.clone();
        }
        config.history.path = normalize_history_path(&config.history.path);
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Run { viewer, category } => {
            let config = cli.load_config()?;
            commands::run::run(config, viewer, category.as_deref()).await?
        }
        Commands::History { action } => {
            let config = cli.load_config()?;
            match action {
                HistoryAction::Show { json } => commands::history::show(&config, *json).await?,
                HistoryAction::Clear => commands::history::clear(&config).await?,
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&cli.load_config()?)?,
            ConfigAction::Validate => commands::config_cmd::validate(&cli.config_path())?,
            ConfigAction::Init { force } => commands::config_cmd::init(&cli.config_path(), *force)?,
        },
    }

    Ok(())
}
