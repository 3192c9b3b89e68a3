use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod anthropic_provider;
pub mod groq_provider;
pub mod local_provider;
pub mod openai_provider;

pub use anthropic_provider::AnthropicProvider;
pub use groq_provider::GroqProvider;
pub use local_provider::LocalProvider;
pub use openai_provider::OpenAiProvider;

/// Request object for LLM providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: &str) -> Self {
        self.system_prompt = Some(system_prompt.to_string());
        self
    }

    pub fn with_parameters(mut self, max_tokens: Option<u32>, temperature: Option<f32>) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// Successful completion. `content` is guaranteed non-empty; token count is
/// best-effort and absent when the backend does not report usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    /// Wall-clock time of the call, measured client-side.
    pub generation_time: Duration,
}

/// Provider identification, for logging and result metadata.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderId {
    pub provider: String,
    pub model: String,
}

impl ProviderId {
    pub fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.provider, self.model)
    }
}

/// Any failure producing a completion: transport, non-success status, empty
/// or malformed response, timeout. The pipeline treats all of these the same
/// way, so there is exactly one error shape and no retryable/fatal split.
#[derive(Error, Debug, Clone)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Map a transport-level error, keeping timeout wording recognizable.
    pub fn from_transport(provider: &str, error: &reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            "request timed out".to_string()
        } else if error.is_connect() {
            format!("connection failed: {error}")
        } else {
            format!("request failed: {error}")
        };
        Self::new(provider, message)
    }
}

/// Unified LLM provider capability.
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Identify this provider instance (backend family + model).
    fn id(&self) -> ProviderId;

    /// Execute one completion request.
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, ProviderError>;
}
