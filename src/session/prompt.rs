//! Prompt assembly.
//!
//! Every prompt is `preamble ++ memory digest ++ transcript`, in that order:
//! personas first, compacted memory second, live detail last.

use super::Session;
use crate::transcript::{Role, Turn};

/// Role-swapped copy of `turns` for drafting the user's side.
///
/// User and assistant turns trade roles; turns spoken by `narrator` and
/// persona turns are passed through unchanged.
pub fn invert_turns(turns: &[Turn], narrator: &str) -> Vec<Turn> {
    turns
        .iter()
        .map(|turn| {
            if turn.name == narrator {
                return turn.clone();
            }
            match turn.role {
                Role::User | Role::Assistant => Turn {
                    role: turn.role.inverted(),
                    ..turn.clone()
                },
                Role::System | Role::UserSystem => turn.clone(),
            }
        })
        .collect()
}

impl Session {
    fn assemble_prompt(&self, preamble: &[Turn], transcript: &[Turn]) -> Vec<Turn> {
        let mut prompt =
            Vec::with_capacity(preamble.len() + self.memory.len() + transcript.len());
        prompt.extend_from_slice(preamble);
        prompt.extend_from_slice(self.memory.as_slice());
        prompt.extend_from_slice(transcript);
        prompt
    }

    /// Prompt for a normal generation call.
    pub fn build_prompt(&self) -> Vec<Turn> {
        self.assemble_prompt(&self.preamble, self.transcript.as_slice())
    }

    /// Prompt for re-sampling the last reply: the transcript without it.
    pub fn build_regenerate_prompt(&self) -> Vec<Turn> {
        self.assemble_prompt(&self.preamble, self.transcript.without_last())
    }

    /// Prompt for drafting candidate user lines.
    pub fn build_inspire_prompt(&self) -> Vec<Turn> {
        let inverted = invert_turns(self.transcript.as_slice(), self.narrator_name());
        self.assemble_prompt(&self.inverted_preamble, &inverted)
    }
}
