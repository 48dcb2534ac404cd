//! Standalone memory compression of a saved session (`rpchat compress`).

use anyhow::{Result, bail};
use console::style;
use std::path::Path;

use rpchat::compaction::{CompactionEngine, CompactionSummary};
use rpchat::completion::MiniMaxClient;
use rpchat::config::Config;
use rpchat::session::SessionState;
use rpchat::ui::icons::MEMORY;

/// Summarize the live transcript of `file` and print the digest. The file is not modified.
pub async fn cmd_compress(config: &Config, file: &Path) -> Result<()> {
    let state = SessionState::load(file)?;
    if state.transcript.is_empty() {
        bail!("Session {} has an empty transcript", file.display());
    }

    let api_key = config.api_key()?;
    let client = MiniMaxClient::new(&config.toml.api.endpoint, api_key);
    let engine = CompactionEngine::new(
        config.toml.api.compress_model.as_str(),
        config.toml.compaction.summary_length,
    );

    let turns = state.transcript.as_slice();
    let digest = engine
        .summarize(&client, turns, config.narrator())
        .await?;
    let summary = CompactionSummary::new(turns, digest);

    println!();
    println!(
        "{}{} {}",
        MEMORY,
        style(format!("{} lines", summary.turns_compacted)).bold(),
        style(format!(
            "({} → {} chars, {:.0}%)",
            summary.original_chars,
            summary.summary_chars,
            summary.compression_ratio() * 100.0
        ))
        .dim()
    );
    println!();
    println!("{}", summary.digest.content);
    Ok(())
}
