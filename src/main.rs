use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rpchat::config::Config;

mod cmd;

#[derive(Parser)]
#[command(name = "rpchat")]
#[command(version, about = "Roleplay chat with long-term memory compression")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding characters/, sessions/, logs/, apikey.json and rpchat.toml
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start or resume an interactive roleplay session
    Chat {
        /// Character the model plays (characters/<ID>.json)
        #[arg(short, long)]
        character: Option<String>,

        /// Persona the user plays (characters/<ID>.json)
        #[arg(long = "self")]
        self_id: Option<String>,

        /// Resume a saved session and keep saving to it
        #[arg(long, conflicts_with = "save")]
        load: Option<PathBuf>,

        /// Where to save a new session (default: sessions/<timestamp>.json)
        #[arg(long)]
        save: Option<PathBuf>,

        /// Roleplay model. Overrides rpchat.toml.
        #[arg(long)]
        model: Option<String>,

        /// Token usage that triggers memory compression. Overrides rpchat.toml.
        #[arg(long)]
        token_threshold: Option<u64>,
    },
    /// Summarize the transcript of a saved session and print the digest
    Compress {
        /// Session file
        file: PathBuf,
    },
    /// List available character ids
    Characters,
    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default rpchat.toml
    Init,
}

fn init_tracing(config: &Config, interactive: bool) {
    let default_level = if config.verbose { "rpchat=debug,warn" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    if interactive {
        // Keep diagnostics out of the conversation.
        let _ = std::fs::create_dir_all(&config.logs_dir);
        let file_appender = tracing_appender::rolling::daily(&config.logs_dir, "rpchat.log");
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = Config::new(data_dir, cli.verbose)?;

    init_tracing(&config, matches!(cli.command, Commands::Chat { .. }));
    tracing::debug!(data_dir = %config.data_dir.display(), "rpchat started");

    match cli.command {
        Commands::Chat {
            character,
            self_id,
            load,
            save,
            model,
            token_threshold,
        } => {
            let mut config = config;
            config.override_model(model);
            config.override_token_threshold(token_threshold);
            cmd::cmd_chat(
                &config,
                cmd::ChatArgs {
                    character,
                    self_id,
                    load,
                    save,
                },
            )
            .await?;
        }
        Commands::Compress { file } => cmd::cmd_compress(&config, &file).await?,
        Commands::Characters => cmd::cmd_characters(&config)?,
        Commands::Config { command } => cmd::cmd_config(&config, command)?,
    }

    Ok(())
}
