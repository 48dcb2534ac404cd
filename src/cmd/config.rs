//! Configuration view and initialization (`rpchat config`).

use anyhow::{Result, bail};

use rpchat::chat_config::ChatToml;
use rpchat::config::Config;

use super::super::ConfigCommands;

pub fn cmd_config(config: &Config, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("rpchat Configuration");
            println!("====================");
            println!();

            if config.config_exists() {
                println!("Config file: {}", config.config_file.display());
            } else {
                println!("No rpchat.toml found at {}", config.config_file.display());
                println!("Using default configuration. Run 'rpchat config init' to create one.");
            }
            println!("Data directory: {}", config.data_dir.display());
            println!();

            println!("Effective values (with env overrides):");
            println!();
            println!("{}", config.toml.to_toml()?);

            let key_status = match config.api_key() {
                Ok(_) => "found",
                Err(_) => "missing",
            };
            println!(
                "API key: {} (env {} or {})",
                key_status,
                config.toml.api.api_key_env,
                config.api_key_file.display()
            );

            let warnings = config.toml.validate();
            if !warnings.is_empty() {
                println!();
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config.config_exists() {
                bail!(
                    "{} already exists. Remove it first to regenerate defaults.",
                    config.config_file.display()
                );
            }
            std::fs::create_dir_all(&config.data_dir)?;
            ChatToml::default().save(&config.config_file)?;
            println!("Created {}", config.config_file.display());
        }
    }

    Ok(())
}
