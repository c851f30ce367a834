use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

const MASK: &str = "********";

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file path")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(force, format),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path => handle_path(),
    }
}

fn handle_init(force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config_path =
        Config::config_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::default().save().context("failed to create config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let config = redacted(Config::load()?);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = Config::config_path().filter(|p| p.exists()) {
        println!("# Config file: {}", path.display());
        println!();
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn handle_path() -> Result<()> {
    let path =
        Config::config_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    let state = if path.exists() { "active" } else { "would be" };
    println!("Config file ({state}): {}", path.display());

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        let state = if env_path.exists() { "active" } else { "would be" };
        println!(".env file ({state}): {}", env_path.display());
    }

    Ok(())
}

/// Hide API keys before printing.
fn redacted(mut config: Config) -> Config {
    for key in [&mut config.embedding.api_key, &mut config.chat.api_key] {
        if key.is_some() {
            *key = Some(MASK.to_string());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_masks_keys() {
        let mut config = Config::default();
        config.embedding.api_key = Some("sk-secret".to_string());

        let shown = redacted(config);
        assert_eq!(shown.embedding.api_key.as_deref(), Some(MASK));
        assert_eq!(shown.chat.api_key, None);
    }
}
