use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;

use crate::chat_config::{CONFIG_FILE_NAME, ChatToml};
use crate::controller::ControllerSettings;

/// File holding the API key as a JSON string when no environment variable is set.
pub const API_KEY_FILE_NAME: &str = "apikey.json";

/// Runtime configuration for rpchat.
///
/// Resolves every path relative to the data directory and carries the
/// layered `rpchat.toml` settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub characters_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub api_key_file: PathBuf,
    pub config_file: PathBuf,
    pub verbose: bool,
    /// Effective settings after file, environment and CLI layering
    pub toml: ChatToml,
}

impl Config {
    /// Load configuration for `data_dir` with file and environment layers applied.
    pub fn new(data_dir: PathBuf, verbose: bool) -> Result<Self> {
        let data_dir = if data_dir.exists() {
            data_dir
                .canonicalize()
                .context("Failed to resolve data directory")?
        } else {
            data_dir
        };

        let mut toml = ChatToml::load_or_default(&data_dir)?;
        toml.apply_env();

        Ok(Self::with_toml(data_dir, verbose, toml))
    }

    pub fn with_toml(data_dir: PathBuf, verbose: bool, toml: ChatToml) -> Self {
        Self {
            characters_dir: data_dir.join("characters"),
            sessions_dir: data_dir.join("sessions"),
            logs_dir: data_dir.join("logs"),
            api_key_file: data_dir.join(API_KEY_FILE_NAME),
            config_file: data_dir.join(CONFIG_FILE_NAME),
            data_dir,
            verbose,
            toml,
        }
    }

    /// Apply CLI overrides, the last configuration layer.
    pub fn override_model(&mut self, model: Option<String>) {
        if let Some(model) = model {
            self.toml.api.model = model;
        }
    }

    pub fn override_token_threshold(&mut self, threshold: Option<u64>) {
        if let Some(threshold) = threshold {
            self.toml.compaction.token_threshold = threshold;
        }
    }

    pub fn model(&self) -> &str {
        &self.toml.api.model
    }

    pub fn narrator(&self) -> &str {
        &self.toml.chat.narrator
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            token_threshold: self.toml.compaction.token_threshold,
            sample_count: self.toml.chat.sample_count,
            compress_model: self.toml.api.compress_model.clone(),
            summary_length: self.toml.compaction.summary_length,
        }
    }

    /// API key from the configured environment variable, else `apikey.json`.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_with(|key| std::env::var(key).ok())
    }

    fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        if let Some(key) = lookup(&self.toml.api.api_key_env)
            && !key.trim().is_empty()
        {
            return Ok(key.trim().to_string());
        }

        if self.api_key_file.exists() {
            let content = std::fs::read_to_string(&self.api_key_file).with_context(|| {
                format!("Failed to read {}", self.api_key_file.display())
            })?;
            let key: String = serde_json::from_str(&content).with_context(|| {
                format!(
                    "{} must contain the API key as a JSON string",
                    self.api_key_file.display()
                )
            })?;
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }

        Err(anyhow!(
            "No API key found. Set {} or write it to {}",
            self.toml.api.api_key_env,
            self.api_key_file.display()
        ))
    }

    /// `sessions/<stamp>.json`
    pub fn default_session_path(&self, stamp: i64) -> PathBuf {
        self.sessions_dir.join(format!("{}.json", stamp))
    }

    /// `logs/<stamp>.log`
    pub fn audit_log_path(&self, stamp: i64) -> PathBuf {
        self.logs_dir.join(format!("{}.log", stamp))
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.sessions_dir)
            .context("Failed to create sessions directory")?;
        std::fs::create_dir_all(&self.logs_dir).context("Failed to create log directory")?;
        Ok(())
    }

    pub fn config_exists(&self) -> bool {
        self.config_file.exists()
    }
}
