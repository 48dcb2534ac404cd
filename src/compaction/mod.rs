//! Memory Compaction
//!
//! Keeps the live transcript within the model's context window by summarizing
//! its oldest turns into a memory digest entry and archiving the originals.
//!
//! ## Triggers
//!
//! - **Automatic**: after a successful generation whose reported token usage
//!   reached the threshold (7000 by default), the older half of the transcript
//!   is compacted.
//! - **Manual**: `compress [arg]` where `arg` is empty (half), `all`, a ratio in
//!   `(0, 1]`, or a negative count meaning "all but the last N".
//!
//! ## Atomicity
//!
//! A compaction is committed only after the summary has been produced. On a
//! failed summarization nothing moves.
//!
//! ```ignore
//! use rpchat::compaction::{CompactionEngine, parse_compaction_span};
//!
//! let span = parse_compaction_span(Some("-2"))?;
//! let count = span.resolve(session.transcript().len())?;
//! let summary = engine.compact(client, &mut session, count).await?;
//! ```

mod engine;
mod span;
mod summary;
mod trigger;

pub use engine::CompactionEngine;
pub use span::{CompactionSpan, parse_compaction_span};
pub use summary::{CompactionSummary, render_dialogue, summary_instruction, summary_request};
pub use trigger::AutoCompaction;

/// Reported token usage at which automatic compaction kicks in.
pub const DEFAULT_TOKEN_THRESHOLD: u64 = 7000;

/// Target length of a digest entry, in characters.
pub const DEFAULT_SUMMARY_LENGTH: usize = 300;
