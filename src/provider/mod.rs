// src/provider/mod.rs — Model provider layer

pub mod google;
pub mod ollama;
pub mod openai_compat;
pub mod resolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::DataScribeError;

/// Core trait that all model providers implement.
///
/// One prompt in, free text out. No streaming, no conversation history.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn default_model(&self) -> &str;

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, DataScribeError>;
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    /// The provider withheld content (safety filters).
    Blocked,
    #[default]
    Unknown,
}

/// Reference to a specific model on a specific provider.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Parse "provider/model" format
    pub fn parse(s: &str) -> Option<Self> {
        let (provider, model) = s.split_once('/')?;
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

// ---------------------------------------------------------------------------
// Shared HTTP error mapping
// ---------------------------------------------------------------------------

pub(crate) fn transport_error(provider: &str, e: reqwest::Error) -> DataScribeError {
    DataScribeError::Provider {
        provider: provider.into(),
        message: e.to_string(),
        retriable: e.is_timeout() || e.is_connect(),
    }
}

/// Map a non-success HTTP status to an error. 429 is a quota error, 401/403
/// an authentication error, 5xx a (retriable) server error.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> DataScribeError {
    use reqwest::StatusCode;

    match status {
        StatusCode::TOO_MANY_REQUESTS => DataScribeError::RateLimited {
            provider: provider.into(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DataScribeError::Provider {
            provider: provider.into(),
            message: format!("authentication failed (HTTP {status}); check the API key"),
            retriable: false,
        },
        _ => DataScribeError::Provider {
            provider: provider.into(),
            message: format!("HTTP {status}: {}", crate::util::clip(body, 500)),
            retriable: status.is_server_error(),
        },
    }
}

pub(crate) fn parse_error(provider: &str, e: impl std::fmt::Display) -> DataScribeError {
    DataScribeError::Provider {
        provider: provider.into(),
        message: format!("Failed to parse response: {e}"),
        retriable: false,
    }
}
