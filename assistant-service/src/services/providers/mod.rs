//! Model provider abstraction.
//!
//! Flows talk to the remote model only through [`TextProvider`], so the
//! Gemini client can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use crate::prompts::RenderedPrompt;
use crate::schema::FieldIssue;
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider rejected specific request fields.
    #[error("Invalid request: {} field violation(s)", .0.len())]
    FieldViolations(Vec<FieldIssue>),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Api { .. } => "api",
            ProviderError::FieldViolations(_) => "field_violations",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered => "content_filtered",
            ProviderError::EmptyResponse => "empty_response",
            ProviderError::Network(_) => "network",
        }
    }
}

/// Result of a provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Raw text of the first candidate.
    pub text: String,

    /// Input tokens consumed.
    pub input_tokens: i32,

    /// Output tokens generated.
    pub output_tokens: i32,

    pub finish_reason: FinishReason,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub(crate) fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST") => {
                FinishReason::ContentFilter
            }
            _ => FinishReason::Complete,
        }
    }
}

/// Generation parameters for a single call.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// Structured-output schema the reply must follow.
    pub output_schema: Option<serde_json::Value>,
}

/// Trait for text/JSON generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Model identifier, used for logs and metrics.
    fn model(&self) -> &str;

    /// Submit a rendered prompt and return the raw reply.
    async fn generate(
        &self,
        prompt: &RenderedPrompt,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;
}
