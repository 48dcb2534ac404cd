//! MiniMax chat-completion v2 client.
//!
//! The provider answers HTTP 200 for most failures and reports them through
//! `base_resp.status_code`, so both the HTTP status and the body status are
//! checked before a response is accepted.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Completion, CompletionClient, CompletionOptions};
use crate::errors::ApiError;
use crate::transcript::Turn;

pub const DEFAULT_ENDPOINT: &str = "https://api.minimax.chat/v1/text/chatcompletion_v2";

/// Client for the MiniMax `chatcompletion_v2` endpoint.
pub struct MiniMaxClient {
    endpoint: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    base_resp: Option<BaseResp>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct BaseResp {
    status_code: i64,
    #[serde(default)]
    status_msg: String,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

impl MiniMaxClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    fn build_request<'a>(messages: &'a [Turn], options: &'a CompletionOptions) -> ChatRequest<'a> {
        ChatRequest {
            model: &options.model,
            messages: messages
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role.as_str(),
                    name: &turn.name,
                    content: &turn.content,
                })
                .collect(),
            n: options.sample_count.filter(|n| *n > 1),
        }
    }
}

/// Turn a raw response body into a completion or the provider's error.
fn parse_response(body: &str) -> Result<Completion, ApiError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::malformed(format!("unparsable response: {e}")))?;

    if let Some(base) = response.base_resp
        && base.status_code != 0
    {
        return Err(ApiError::new(base.status_code, base.status_msg));
    }

    if response.choices.is_empty() {
        return Err(ApiError::malformed("response contained no choices"));
    }

    Ok(Completion {
        choices: response
            .choices
            .into_iter()
            .map(|choice| choice.message.content)
            .collect(),
        token_usage: response.usage.map(|u| u.total_tokens).unwrap_or(0),
    })
}

#[async_trait]
impl CompletionClient for MiniMaxClient {
    async fn complete(
        &self,
        messages: &[Turn],
        options: &CompletionOptions,
    ) -> Result<Completion, ApiError> {
        let request = Self::build_request(messages, options);
        debug!(
            model = %options.model,
            messages = messages.len(),
            samples = options.samples(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("completion request failed: {}", e);
                ApiError::transport(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            warn!("completion endpoint returned HTTP {}: {}", status, body);
            return Err(ApiError::new(i64::from(status.as_u16()), body));
        }

        let completion = parse_response(&body)?;
        debug!(
            choices = completion.choices.len(),
            tokens = completion.token_usage,
            "completion received"
        );
        Ok(completion)
    }
}
