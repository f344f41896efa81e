//! `chatterbox config` — Configuration management commands.

use std::path::Path;

use chatterbox_config::AppConfig;

pub fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config.clone();
    if config.provider.api_key.is_some() {
        config.provider.api_key = Some("[REDACTED]".into());
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}...", path.display());

    let config = match AppConfig::load_from(path) {
        Ok(config) => config,
        Err(e) => {
            println!("  Config error: {e}");
            return Err(e.into());
        }
    };
    println!("  Config parsed and validated");

    let mut warnings = Vec::new();
    if config.provider.kind == "openai" && config.provider.api_key.is_none() {
        warnings.push("provider.kind is \"openai\" but no api_key is set (or CHATTERBOX_API_KEY)");
    }
    if config.bot.followup_timeout().is_none() {
        warnings.push("bot.followup_timeout_secs is unset; tool and safety calls have no deadline");
    }
    for w in &warnings {
        println!("  warning: {w}");
    }

    println!();
    println!("  Provider:  {}", config.provider.kind);
    println!("  Model:     {}", config.provider.model);
    println!("  Bot:       {} (prefix \"{}\")", config.bot.bot_name, config.bot.command_prefix);
    println!("  Streamer:  {}", config.bot.streamer());
    println!("  History:   {} (cap {})", config.history.path.display(), config.bot.max_history);
    Ok(())
}

pub fn init(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_config_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init(&path, false).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.bot.command_prefix, "!ai");

        assert!(init(&path, false).is_err());
        assert!(init(&path, true).is_ok());
    }

    #[test]
    fn validate_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bot]\nmax_history = \"lots\"\n").unwrap();
        assert!(validate(&path).is_err());
    }
}
