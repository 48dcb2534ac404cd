//! Completion capability: the single request/response call to the language model.
//!
//! Everything above this module talks to the model through [`CompletionClient`].
//! A call either yields a [`Completion`] or an [`ApiError`]; it never mutates
//! session state, so callers decide what to commit after it returns.

mod minimax;
mod scripted;

pub use minimax::{DEFAULT_ENDPOINT, MiniMaxClient};
pub use scripted::{RecordedRequest, ScriptedClient};

use async_trait::async_trait;

use crate::errors::ApiError;
use crate::transcript::Turn;

/// Per-request options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOptions {
    pub model: String,
    /// Number of sampled alternatives; `None` means one.
    pub sample_count: Option<u32>,
}

impl CompletionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            sample_count: None,
        }
    }

    pub fn with_samples(mut self, count: u32) -> Self {
        self.sample_count = Some(count);
        self
    }

    pub fn samples(&self) -> u32 {
        self.sample_count.unwrap_or(1)
    }
}

/// Successful model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Content of every returned choice, in provider order.
    pub choices: Vec<String>,
    /// Total tokens reported for the call (prompt + output).
    pub token_usage: u64,
}

impl Completion {
    pub fn new(choices: Vec<String>, token_usage: u64) -> Self {
        Self {
            choices,
            token_usage,
        }
    }

    pub fn single(content: impl Into<String>, token_usage: u64) -> Self {
        Self::new(vec![content.into()], token_usage)
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Issue exactly one completion request for `messages`.
    async fn complete(
        &self,
        messages: &[Turn],
        options: &CompletionOptions,
    ) -> Result<Completion, ApiError>;
}
