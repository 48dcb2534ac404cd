//! Token-usage trigger for automatic compaction.

use super::DEFAULT_TOKEN_THRESHOLD;

/// Decides, after each successful generation, whether to compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoCompaction {
    threshold: u64,
}

impl AutoCompaction {
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// True when the reported usage of the last call reached the threshold.
    pub fn should_compact(&self, token_usage: u64) -> bool {
        token_usage >= self.threshold
    }

    /// Number of leading turns to compact: the older half, by count.
    pub fn span_for(&self, transcript_len: usize) -> usize {
        transcript_len / 2
    }

    /// Usage as a percentage of the threshold.
    pub fn usage_percentage(&self, token_usage: u64) -> f32 {
        if self.threshold == 0 {
            return 100.0;
        }
        (token_usage as f32 / self.threshold as f32) * 100.0
    }
}

impl Default for AutoCompaction {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_THRESHOLD)
    }
}
