use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerationError, LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

/// API version header required by the Anthropic Messages endpoint.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Remote LLM provider using the Anthropic Messages HTTP API
pub struct AnthropicProvider {
    api_url: String,
    api_key: String,
    model: String,
    default_timeout: Duration,
    default_max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            default_timeout: Duration::from_secs(60),
            default_max_tokens: 2000,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(mut self, timeout_secs: u64, max_tokens: u32) -> Self {
        self.default_timeout = Duration::from_secs(timeout_secs);
        self.default_max_tokens = max_tokens;
        self
    }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, GenerationError> {
        let timeout_secs = request
            .timeout_seconds
            .unwrap_or(self.default_timeout.as_secs());
        let max_tokens = request.max_tokens.unwrap_or(self.default_max_tokens);

        let req_body = MessagesRequest {
            model: self.model.clone(),
            max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt,
            }],
        };

        let response = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.client
                .post(&self.api_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send(),
        )
        .await
        .map_err(|_| GenerationError::Timeout(timeout_secs))??;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status,
                message: decode_error_message(&body),
            });
        }

        let resp_body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let content = resp_body
            .content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.clone())
            .ok_or_else(|| {
                GenerationError::InvalidResponse("response has no text content".to_string())
            })?;

        let usage = UsageMetadata {
            input_tokens: resp_body.usage.input_tokens.unwrap_or(0),
            output_tokens: resp_body.usage.output_tokens.unwrap_or(0),
        };

        Ok(LlmResponse {
            content,
            model: resp_body.model.unwrap_or_else(|| self.model.clone()),
            usage,
        })
    }
}

/// Pull the human-readable message out of an Anthropic error body, falling
/// back to the raw body when it is not the documented envelope.
fn decode_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// Anthropic Messages API request/response structures
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: Option<String>,
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: Option<usize>,
    #[serde(default)]
    output_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
