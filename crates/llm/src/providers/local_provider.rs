use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{LlmProvider, LlmRequest, LlmResponse, ProviderError, ProviderId};

/// Locally-hosted OpenAI-compatible endpoint (Ollama, LM Studio, llama.cpp
/// server, ...). Unlike the hosted providers there is no default base URL;
/// the endpoint must come from configuration. Authentication is optional.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: Client,
}

impl LocalProvider {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if base_url.is_empty() {
            return Err(anyhow!("Local endpoint URL cannot be empty"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for LocalProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new("local", &self.model)
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, ProviderError> {
        let started = Instant::now();

        let mut messages = Vec::new();
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system_prompt.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            "Sending request to local endpoint {} (model: {})",
            self.base_url, self.model
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("local", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                "local",
                format!("endpoint returned {status}: {error_text}"),
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new("local", format!("malformed response: {e}")))?;

        let content = chat_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ProviderError::new("local", "empty completion"));
        }

        let elapsed = started.elapsed();
        info!("Local completion in {:?}", elapsed);

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            // Local runtimes often omit usage; absence is not an error.
            tokens_used: chat_response.usage.map(|u| u.total_tokens),
            generation_time: elapsed,
        })
    }
}

// OpenAI-compatible wire types.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}
