//! Compaction engine: summarize a transcript prefix and commit it.

use tracing::{debug, info};

use super::summary::{CompactionSummary, summary_request};
use super::DEFAULT_SUMMARY_LENGTH;
use crate::completion::{CompletionClient, CompletionOptions};
use crate::errors::{ApiError, ChatError, ChatResult};
use crate::session::Session;
use crate::transcript::Turn;

/// Summarizes the oldest transcript turns into a memory digest entry.
///
/// The summary is requested first and the session is only touched once it
/// has arrived, so a failed call leaves the transcript, digest and archive
/// unchanged.
#[derive(Debug, Clone)]
pub struct CompactionEngine {
    /// Model used for summarization (usually cheaper than the chat model).
    model: String,
    /// Target summary length in characters.
    summary_length: usize,
}

impl CompactionEngine {
    pub fn new(model: impl Into<String>, summary_length: usize) -> Self {
        Self {
            model: model.into(),
            summary_length,
        }
    }

    pub fn with_defaults(model: impl Into<String>) -> Self {
        Self::new(model, DEFAULT_SUMMARY_LENGTH)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn summary_length(&self) -> usize {
        self.summary_length
    }

    /// Summarize `turns` into a digest turn spoken by `narrator`.
    pub async fn summarize(
        &self,
        client: &dyn CompletionClient,
        turns: &[Turn],
        narrator: &str,
    ) -> Result<Turn, ApiError> {
        let request = summary_request(turns, self.summary_length);
        debug!(turns = turns.len(), model = %self.model, "requesting summary");

        let completion = client
            .complete(&request, &CompletionOptions::new(self.model.as_str()))
            .await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::malformed("summarizer returned an empty summary"))?;

        Ok(Turn::assistant(narrator, content))
    }

    /// Compact the first `count` turns of the session's transcript.
    pub async fn compact(
        &self,
        client: &dyn CompletionClient,
        session: &mut Session,
        count: usize,
    ) -> ChatResult<CompactionSummary> {
        let count = count.min(session.transcript().len());
        if count == 0 {
            return Err(ChatError::InvalidState(
                "nothing to compress in the transcript".to_string(),
            ));
        }

        let prefix = &session.transcript().as_slice()[..count];
        let digest = self
            .summarize(client, prefix, session.narrator_name())
            .await?;
        let summary = CompactionSummary::new(prefix, digest.clone());

        session.commit_compaction(count, digest);
        info!(
            turns = summary.turns_compacted,
            original_chars = summary.original_chars,
            summary_chars = summary.summary_chars,
            "compaction committed"
        );
        Ok(summary)
    }
}
