use reqwest::StatusCode;
use thiserror::Error;

/// Core trait for LLM completion providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, GenerationError>;
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub usage: UsageMetadata,
}

/// Token usage metadata for logging
#[derive(Debug, Clone, Default)]
pub struct UsageMetadata {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Errors from a single completion call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("malformed API response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Whether a retry is expected to succeed. Timeouts, transport
    /// failures, rate limits and server errors are transient; everything
    /// else (bad credentials, malformed requests or responses) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Api { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            }
            Self::InvalidResponse(_) => false,
        }
    }
}

pub mod anthropic;
