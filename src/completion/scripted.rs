//! In-memory completion client that replays canned results.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Completion, CompletionClient, CompletionOptions};
use crate::errors::ApiError;
use crate::transcript::Turn;

/// A request observed by [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub messages: Vec<Turn>,
    pub options: CompletionOptions,
}

/// Completion client that answers from a queue and records every request.
///
/// An exhausted queue answers with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<Completion, ApiError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: impl IntoIterator<Item = Result<Completion, ApiError>>) -> Self {
        let client = Self::new();
        for response in responses {
            client.push(response);
        }
        client
    }

    pub fn push(&self, response: Result<Completion, ApiError>) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
    }

    pub fn push_reply(&self, content: impl Into<String>, token_usage: u64) {
        self.push(Ok(Completion::single(content, token_usage)));
    }

    pub fn push_error(&self, code: i64, message: impl Into<String>) {
        self.push(Err(ApiError::new(code, message)));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        messages: &[Turn],
        options: &CompletionOptions,
    ) -> Result<Completion, ApiError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedRequest {
                messages: messages.to_vec(),
                options: options.clone(),
            });
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::transport("no scripted response left")))
    }
}
