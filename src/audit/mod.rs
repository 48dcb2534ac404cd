//! Append-only audit record of a chat session.
//!
//! One line per event:
//!
//! ```text
//! 2024-05-01T12:00:00+00:00|append|user|Bob|hello
//! 2024-05-01T12:00:03+00:00|api_error|||(1002) rate limited
//! ```
//!
//! Newlines inside content are written as `\n`. Nothing in the engine reads
//! this file back.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::ApiError;
use crate::transcript::Turn;

/// Kind of audit line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    Append,
    Rewrite,
    Compact,
    Archive,
    ApiError,
    Warn,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::Append => "append",
            AuditEvent::Rewrite => "rewrite",
            AuditEvent::Compact => "compact",
            AuditEvent::Archive => "archive",
            AuditEvent::ApiError => "api_error",
            AuditEvent::Warn => "warn",
        }
    }
}

/// Writer for the audit file. A log without a path discards everything.
#[derive(Debug, Clone, Default)]
pub struct TranscriptLog {
    path: Option<PathBuf>,
}

impl TranscriptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record_turn(&self, event: AuditEvent, turn: &Turn) -> Result<()> {
        self.write_line(event, turn.role.as_str(), &turn.name, &turn.content)
    }

    pub fn record_turns(&self, event: AuditEvent, turns: &[Turn]) -> Result<()> {
        for turn in turns {
            self.record_turn(event, turn)?;
        }
        Ok(())
    }

    pub fn record_api_error(&self, error: &ApiError) -> Result<()> {
        self.write_line(
            AuditEvent::ApiError,
            "",
            "",
            &format!("({}) {}", error.code, error.message),
        )
    }

    pub fn record_warning(&self, message: &str) -> Result<()> {
        self.write_line(AuditEvent::Warn, "", "", message)
    }

    fn write_line(&self, event: AuditEvent, role: &str, speaker: &str, content: &str) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let line = format!(
            "{}|{}|{}|{}|{}\n",
            Utc::now().to_rfc3339(),
            event.as_str(),
            role,
            escape(speaker),
            escape(content)
        );

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context("Failed to open audit log")?
            .write_all(line.as_bytes())
            .context("Failed to write audit entry")?;

        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}
