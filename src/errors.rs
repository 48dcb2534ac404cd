//! Typed error hierarchy for the chat engine.
//!
//! - `ApiError`: a failed call to the completion capability
//! - `ChatError`: everything a session command can fail with
//!
//! None of the `ChatError` variants mutate session state: a command that
//! returns an error leaves the transcript, memory digest and archive exactly
//! as they were.

use thiserror::Error;

/// Status code used when the request never produced an HTTP response.
pub const TRANSPORT_ERROR_CODE: i64 = -1;

/// Status code used when the provider answered with a body we could not use.
pub const MALFORMED_RESPONSE_CODE: i64 = -2;

/// Failure reported by the completion capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API error ({code}): {message}")]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

impl ApiError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(TRANSPORT_ERROR_CODE, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(MALFORMED_RESPONSE_CODE, message)
    }
}

/// Errors from session commands.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    ValidationFailure(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChatError {
    /// Short tag used in the audit log.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Api(_) => "api_error",
            ChatError::InvalidArgument(_) => "invalid_argument",
            ChatError::InvalidState(_) => "invalid_state",
            ChatError::ValidationFailure(_) => "validation_failure",
            ChatError::Other(_) => "error",
        }
    }
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
