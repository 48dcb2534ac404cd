//! Summarization request building and the record of a finished compaction.

use chrono::{DateTime, Utc};

use crate::transcript::Turn;

/// Speaker name of the summarization instruction.
pub const SUMMARIZER_NAME: &str = "Memory compression";

/// Speaker name of the dialogue handed to the summarizer.
pub const DIALOGUE_SPEAKER: &str = "User";

/// Render turns as `speaker: content` lines, one per turn, in order.
pub fn render_dialogue(turns: &[Turn]) -> String {
    let mut text = String::new();
    for turn in turns {
        text.push_str(&turn.render_line());
        text.push('\n');
    }
    text
}

/// Fixed instruction asking for a one-paragraph summary of `length` characters.
pub fn summary_instruction(length: usize) -> String {
    format!(
        "Summarize the following dialogue into one paragraph of about {} characters. \
         Output the summary on a single line.",
        length
    )
}

/// Messages sent to the summarization model for `turns`.
pub fn summary_request(turns: &[Turn], length: usize) -> Vec<Turn> {
    vec![
        Turn::system(SUMMARIZER_NAME, summary_instruction(length)),
        Turn::user(DIALOGUE_SPEAKER, render_dialogue(turns)),
    ]
}

/// A committed compaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionSummary {
    pub generated_at: DateTime<Utc>,
    /// Number of transcript turns moved to the archive.
    pub turns_compacted: usize,
    /// Characters of the compacted turns' content.
    pub original_chars: usize,
    /// Characters of the digest entry.
    pub summary_chars: usize,
    /// The entry appended to the memory digest.
    pub digest: Turn,
}

impl CompactionSummary {
    pub fn new(compacted: &[Turn], digest: Turn) -> Self {
        Self {
            generated_at: Utc::now(),
            turns_compacted: compacted.len(),
            original_chars: compacted.iter().map(|t| t.content.chars().count()).sum(),
            summary_chars: digest.content.chars().count(),
            digest,
        }
    }

    /// Summary size relative to the original (0.0 to 1.0 when it shrank).
    pub fn compression_ratio(&self) -> f32 {
        if self.original_chars == 0 {
            return 1.0;
        }
        self.summary_chars as f32 / self.original_chars as f32
    }
}
