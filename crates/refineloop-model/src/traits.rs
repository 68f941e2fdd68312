use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while requesting a completion
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to decode model response: {0}")]
    InvalidResponse(String),

    #[error("Model returned no completion")]
    EmptyResponse,

    #[error("Model configuration error: {0}")]
    Configuration(String),
}

impl ModelError {
    /// Whether a later attempt with the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit(_) | Self::Connection(_) | Self::Timeout(_) | Self::Server { .. }
        )
    }
}

/// Output shape requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// A single JSON object
    JsonObject,
}

/// A single completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Optional structured-output hint (None = provider default)
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature,
            max_tokens,
            response_format: None,
        }
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// The core abstraction for anything that completes text from a prompt
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Human-readable name of the backing model (e.g., "gemma2-9b-it")
    fn name(&self) -> &str;

    /// Complete the request and return the raw text of the reply
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError>;
}
