use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{LlmProvider, LlmRequest, LlmResponse, ProviderError, ProviderId};

// Groq serves an OpenAI-compatible API under its own host.
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Clone)]
pub struct GroqProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GroqProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("Groq API key cannot be empty"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new("groq", &self.model)
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

        debug!("Sending request to Groq (model: {})", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("groq", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                "groq",
                format!("API returned {status}: {error_text}"),
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new("groq", format!("malformed response: {e}")))?;

        let content = chat_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ProviderError::new("groq", "empty completion"));
        }

        let elapsed = started.elapsed();
        let tokens_used = chat_response.usage.map(|u| u.total_tokens);
        info!("Groq completion in {:?}", elapsed);

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            tokens_used,
            generation_time: elapsed,
        })
    }
}

// Groq wire types (OpenAI chat-completion shape).
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = GroqProvider::new(
            "test-api-key".to_string(),
            "llama-3.1-8b-instant".to_string(),
            None,
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(provider.id().provider, "groq");

        assert!(GroqProvider::new(
            String::new(),
            "llama-3.1-8b-instant".to_string(),
            None,
            Duration::from_secs(30),
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-api-key")
            .with_status(200)
            .with_body(
                r#"{
                    "choices": [{"message": {"role": "assistant", "content": "Nice balance today."}}],
                    "usage": {"total_tokens": 17}
                }"#,
            )
            .create_async()
            .await;

        let provider = GroqProvider::new(
            "test-api-key".to_string(),
            "llama-3.1-8b-instant".to_string(),
            Some(server.url()),
            Duration::from_secs(5),
        )
        .unwrap();

        let response = provider.generate(LlmRequest::new("How did I do?")).await.unwrap();
        assert_eq!(response.content, "Nice balance today.");
        assert_eq!(response.tokens_used, Some(17));
    }
}
