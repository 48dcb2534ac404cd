//! Parsing of the manual `compress` argument and resolution to a turn count.

use crate::errors::{ChatError, ChatResult};

/// How much of the transcript a manual compaction covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompactionSpan {
    /// The older half, by count (no argument).
    Half,
    /// The whole transcript (`all`).
    All,
    /// A fraction in `(0, 1]` of the transcript.
    Ratio(f64),
    /// Everything except the last `|offset|` turns (a negative number).
    AllBut(f64),
}

impl CompactionSpan {
    /// Number of leading turns to compact in a transcript of `len` turns.
    ///
    /// Fails with `InvalidArgument` when the span selects nothing.
    pub fn resolve(&self, len: usize) -> ChatResult<usize> {
        match *self {
            CompactionSpan::Half => Ok(len / 2),
            CompactionSpan::All => Ok(len),
            CompactionSpan::Ratio(ratio) => {
                let count = (len as f64 * ratio).round();
                if count < 1.0 {
                    return Err(ChatError::InvalidArgument(format!(
                        "{} of {} turns rounds to nothing",
                        ratio, len
                    )));
                }
                Ok(count as usize)
            }
            CompactionSpan::AllBut(offset) => {
                let count = (len as f64 + offset).round();
                if count < 1.0 {
                    return Err(ChatError::InvalidArgument(format!(
                        "keeping the last {} of {} turns leaves nothing to compress",
                        -offset, len
                    )));
                }
                Ok(count as usize)
            }
        }
    }
}

impl std::fmt::Display for CompactionSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompactionSpan::Half => write!(f, "half"),
            CompactionSpan::All => write!(f, "all"),
            CompactionSpan::Ratio(ratio) => write!(f, "{}", ratio),
            CompactionSpan::AllBut(offset) => write!(f, "{}", offset),
        }
    }
}

/// Parse the optional argument of `compress`.
///
/// Accepts:
/// - nothing: the older half
/// - `all`: the whole transcript
/// - a ratio in `(0, 1]`, e.g. `0.5`
/// - a negative count, e.g. `-2` to keep the last two turns
///
/// Anything else, including more than one argument, is `InvalidArgument`.
pub fn parse_compaction_span(arg: Option<&str>) -> ChatResult<CompactionSpan> {
    let words: Vec<&str> = arg.map(|a| a.split_whitespace().collect()).unwrap_or_default();

    let word = match words.as_slice() {
        [] => return Ok(CompactionSpan::Half),
        [word] => *word,
        _ => {
            return Err(ChatError::InvalidArgument(format!(
                "compress takes at most one argument, got {}",
                words.len()
            )));
        }
    };

    if word.eq_ignore_ascii_case("all") {
        return Ok(CompactionSpan::All);
    }

    let value: f64 = word.parse().map_err(|_| {
        ChatError::InvalidArgument(format!(
            "'{}' is not 'all', a ratio in (0, 1], or a negative count",
            word
        ))
    })?;

    if !value.is_finite() {
        return Err(ChatError::InvalidArgument(format!(
            "'{}' is not a finite number",
            word
        )));
    }

    if value > 0.0 && value <= 1.0 {
        Ok(CompactionSpan::Ratio(value))
    } else if value < 0.0 {
        Ok(CompactionSpan::AllBut(value))
    } else {
        Err(ChatError::InvalidArgument(format!(
            "{} is outside (0, 1] and not negative",
            value
        )))
    }
}
