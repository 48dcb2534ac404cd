//! Conversation primitives: turns, the live transcript, and append-only turn logs.
//!
//! The transcript is the only sequence that shrinks. Turns leave it exclusively
//! through [`Transcript::remove_prefix`], which the compaction engine calls after
//! a summary has been produced; the removed turns are then appended to the
//! archived log so nothing is ever dropped.

use serde::{Deserialize, Serialize};

use crate::errors::{ChatError, ChatResult};

/// Speaker role of a turn, as understood by the completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Persona description of the human side of the conversation.
    UserSystem,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::UserSystem => "user_system",
        }
    }

    /// Swap the two dialogue roles; persona roles are left alone.
    pub fn inverted(self) -> Role {
        match self {
            Role::User => Role::Assistant,
            Role::Assistant => Role::User,
            Role::System => Role::System,
            Role::UserSystem => Role::UserSystem,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    /// Speaker name shown to the model.
    pub name: String,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn system(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(Role::System, name, content)
    }

    pub fn user(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(Role::User, name, content)
    }

    pub fn assistant(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, name, content)
    }

    pub fn user_system(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(Role::UserSystem, name, content)
    }

    /// `speaker: content`, the line format used when summarizing.
    pub fn render_line(&self) -> String {
        format!("{}: {}", self.name, self.content)
    }
}

/// Ordered, append-only list of turns.
///
/// Used for both the memory digest (one summary turn per compaction) and the
/// archived raw log (the turns each summary replaced).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnLog {
    turns: Vec<Turn>,
}

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.turns.extend(turns);
    }

    pub fn as_slice(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}

/// Compacted summaries standing in for archived turns.
pub type MemoryDigest = TurnLog;

/// Raw turns removed from the transcript by compaction.
pub type ArchivedLog = TurnLog;

/// The live, model-visible conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Start a transcript seeded with its opening turn.
    pub fn seeded(opening: Turn) -> Self {
        Self {
            turns: vec![opening],
        }
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Check that the last turn is a reply by `character` that may be replaced.
    ///
    /// The opening line (a transcript of one turn) and narrator or user lines
    /// are never valid targets.
    pub fn ensure_replaceable(&self, character: &str) -> ChatResult<&Turn> {
        if self.turns.len() < 2 {
            return Err(ChatError::InvalidState(
                "the opening line cannot be rewritten or regenerated".to_string(),
            ));
        }
        match self.turns.last() {
            Some(turn) if turn.role == Role::Assistant && turn.name == character => Ok(turn),
            Some(turn) => Err(ChatError::InvalidState(format!(
                "the last line is by {} ({}), not a reply from {}",
                turn.name, turn.role, character
            ))),
            None => Err(ChatError::InvalidState("the transcript is empty".to_string())),
        }
    }

    /// Replace the content of the last turn, which must be a reply by `character`.
    pub fn rewrite_last(&mut self, content: impl Into<String>, character: &str) -> ChatResult<()> {
        self.ensure_replaceable(character)?;
        if let Some(last) = self.turns.last_mut() {
            last.content = content.into();
        }
        Ok(())
    }

    /// Remove and return the first `count` turns (clamped to the length).
    pub fn remove_prefix(&mut self, count: usize) -> Vec<Turn> {
        let count = count.min(self.turns.len());
        self.turns.drain(..count).collect()
    }

    /// All turns except the last one.
    pub fn without_last(&self) -> &[Turn] {
        match self.turns.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn as_slice(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}
