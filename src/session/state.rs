//! Persisted session record.
//!
//! Only the ids of the personas are stored; the preamble is rebuilt from the
//! persona files on load so edits to a character take effect on resume.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::transcript::{ArchivedLog, MemoryDigest, Transcript};

/// Serialized form of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub character_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_id: Option<String>,
    #[serde(default)]
    pub memory_digest: MemoryDigest,
    #[serde(default)]
    pub archived_log: ArchivedLog,
    /// Older session files call this `chatLog`.
    #[serde(alias = "chatLog")]
    pub transcript: Transcript,
}

impl SessionState {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file {}", path.display()))
    }

    /// Write the record, replacing any previous file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create session directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).context("Failed to write session file")?;
        fs::rename(&tmp, path).context("Failed to replace session file")?;
        Ok(())
    }
}
