//! Session aggregate: personas, preamble, memory digest, archive and transcript.
//!
//! A `Session` exclusively owns the three logs. Mutating methods are crate
//! private; outside code goes through the controller.

mod prompt;
mod state;

pub use prompt::invert_turns;
pub use state::SessionState;

use crate::errors::ChatResult;
use crate::persona::Cast;
use crate::transcript::{ArchivedLog, MemoryDigest, Transcript, Turn};

#[derive(Debug, Clone)]
pub struct Session {
    cast: Cast,
    preamble: Vec<Turn>,
    inverted_preamble: Vec<Turn>,
    memory: MemoryDigest,
    archive: ArchivedLog,
    transcript: Transcript,
    model: String,
}

impl Session {
    /// Start a new session seeded with the character's opening turn.
    pub fn fresh(cast: Cast, model: impl Into<String>) -> Self {
        let opening = cast.opening_turn();
        Self::assemble(
            cast,
            model.into(),
            MemoryDigest::new(),
            ArchivedLog::new(),
            Transcript::seeded(opening),
        )
    }

    /// Resume from a persisted record, rebuilding the preamble from `cast`.
    pub fn restore(cast: Cast, model: impl Into<String>, state: SessionState) -> Self {
        Self::assemble(
            cast,
            model.into(),
            state.memory_digest,
            state.archived_log,
            state.transcript,
        )
    }

    fn assemble(
        cast: Cast,
        model: String,
        memory: MemoryDigest,
        archive: ArchivedLog,
        transcript: Transcript,
    ) -> Self {
        Self {
            preamble: cast.preamble(),
            inverted_preamble: cast.inverted_preamble(),
            cast,
            memory,
            archive,
            transcript,
            model,
        }
    }

    pub fn to_state(&self) -> SessionState {
        SessionState {
            character_id: self.cast.character_id.clone(),
            self_id: self.cast.self_id.clone(),
            memory_digest: self.memory.clone(),
            archived_log: self.archive.clone(),
            transcript: self.transcript.clone(),
        }
    }

    pub fn character_name(&self) -> &str {
        &self.cast.character.name
    }

    pub fn counterpart_name(&self) -> &str {
        &self.cast.counterpart.name
    }

    pub fn narrator_name(&self) -> &str {
        &self.cast.narrator.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn preamble(&self) -> &[Turn] {
        &self.preamble
    }

    pub fn inverted_preamble(&self) -> &[Turn] {
        &self.inverted_preamble
    }

    pub fn memory(&self) -> &MemoryDigest {
        &self.memory
    }

    pub fn archive(&self) -> &ArchivedLog {
        &self.archive
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn append(&mut self, turn: Turn) {
        self.transcript.append(turn);
    }

    pub(crate) fn rewrite_last(&mut self, content: impl Into<String>) -> ChatResult<()> {
        let character = self.cast.character.name.clone();
        self.transcript.rewrite_last(content, &character)
    }

    /// Move the first `count` turns to the archive and record their digest.
    pub(crate) fn commit_compaction(&mut self, count: usize, digest: Turn) {
        let compacted = self.transcript.remove_prefix(count);
        self.archive.extend(compacted);
        self.memory.push(digest);
    }
}
