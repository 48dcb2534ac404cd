//! Layered configuration read from `rpchat.toml`.
//!
//! Every field is optional. Values are resolved file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! endpoint = "https://api.minimax.chat/v1/text/chatcompletion_v2"
//! model = "abab6.5s-chat"
//! compress_model = "abab6.5s-chat"
//! api_key_env = "MINIMAX_API_KEY"
//!
//! [compaction]
//! token_threshold = 7000
//! summary_length = 300
//!
//! [chat]
//! sample_count = 3
//! narrator = "Narrator"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::compaction::{DEFAULT_SUMMARY_LENGTH, DEFAULT_TOKEN_THRESHOLD};
use crate::completion::DEFAULT_ENDPOINT;
use crate::controller::DEFAULT_SAMPLE_COUNT;

/// File name of the configuration file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "rpchat.toml";

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "abab6.5s-chat";

/// Environment variable holding the API key unless configured otherwise.
pub const DEFAULT_API_KEY_ENV: &str = "MINIMAX_API_KEY";

pub const DEFAULT_NARRATOR: &str = "Narrator";

/// Completion provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Roleplay model
    #[serde(default = "default_model")]
    pub model: String,
    /// Summarization model
    #[serde(default = "default_model")]
    pub compress_model: String,
    /// Name of the environment variable carrying the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            compress_model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Memory compaction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionSection {
    /// Total-token usage at which half of the transcript is compacted
    #[serde(default = "default_token_threshold")]
    pub token_threshold: u64,
    /// Target summary length in characters
    #[serde(default = "default_summary_length")]
    pub summary_length: usize,
}

fn default_token_threshold() -> u64 {
    DEFAULT_TOKEN_THRESHOLD
}

fn default_summary_length() -> usize {
    DEFAULT_SUMMARY_LENGTH
}

impl Default for CompactionSection {
    fn default() -> Self {
        Self {
            token_threshold: default_token_threshold(),
            summary_length: default_summary_length(),
        }
    }
}

/// Chat loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSection {
    /// Alternatives offered by regenerate and inspire
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,
    /// Speaker name of narration and memory entries
    #[serde(default = "default_narrator")]
    pub narrator: String,
}

fn default_sample_count() -> u32 {
    DEFAULT_SAMPLE_COUNT
}

fn default_narrator() -> String {
    DEFAULT_NARRATOR.to_string()
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            narrator: default_narrator(),
        }
    }
}

/// The complete rpchat.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub compaction: CompactionSection,
    #[serde(default)]
    pub chat: ChatSection,
}

impl ChatToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse rpchat.toml")
    }

    /// Load `rpchat.toml` from `data_dir`, or defaults when the file is absent.
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize rpchat.toml")
    }

    /// Apply `RPCHAT_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides looked up by environment variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("RPCHAT_ENDPOINT") {
            self.api.endpoint = endpoint;
        }
        if let Some(model) = lookup("RPCHAT_MODEL") {
            self.api.model = model;
        }
        if let Some(model) = lookup("RPCHAT_COMPRESS_MODEL") {
            self.api.compress_model = model;
        }
        if let Some(threshold) = lookup("RPCHAT_TOKEN_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.compaction.token_threshold = threshold;
        }
    }

    /// Check the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.compaction.token_threshold == 0 {
            warnings.push(
                "compaction.token_threshold is 0: every reply will trigger compression"
                    .to_string(),
            );
        }
        if self.compaction.summary_length == 0 {
            warnings.push("compaction.summary_length should be greater than 0".to_string());
        }
        if self.chat.sample_count == 0 {
            warnings.push("chat.sample_count is 0: one candidate will be requested".to_string());
        }
        if self.chat.narrator.trim().is_empty() {
            warnings.push("chat.narrator should not be empty".to_string());
        }

        warnings
    }
}
