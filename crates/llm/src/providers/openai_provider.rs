use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{LlmProvider, LlmRequest, LlmResponse, ProviderError, ProviderId};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("OpenAI API key cannot be empty"));
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
impl LlmProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new("openai", &self.model)
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

        debug!("Sending request to OpenAI (model: {})", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("openai", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                "openai",
                format!("API returned {status}: {error_text}"),
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new("openai", format!("malformed response: {e}")))?;

        let content = chat_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ProviderError::new("openai", "empty completion"));
        }

        let elapsed = started.elapsed();
        let tokens_used = chat_response.usage.map(|u| u.total_tokens);
        info!(
            "OpenAI completion in {:?} ({} tokens)",
            elapsed,
            tokens_used.map_or_else(|| "?".to_string(), |t| t.to_string())
        );

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            tokens_used,
            generation_time: elapsed,
        })
    }
}

// OpenAI wire types.
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

    fn provider_for(server: &mockito::ServerGuard) -> OpenAiProvider {
        OpenAiProvider::new(
            "test-api-key".to_string(),
            "gpt-4o-mini".to_string(),
            Some(server.url()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_provider_creation() {
        let provider = OpenAiProvider::new(
            "test-api-key".to_string(),
            "gpt-4o-mini".to_string(),
            None,
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(provider.id().provider, "openai");
        assert_eq!(provider.id().model, "gpt-4o-mini");

        assert!(OpenAiProvider::new(
            String::new(),
            "gpt-4o-mini".to_string(),
            None,
            Duration::from_secs(30),
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-api-key")
            .with_status(200)
            .with_body(
                r#"{
                    "choices": [{"message": {"role": "assistant", "content": "Great work today!"}}],
                    "usage": {"total_tokens": 42}
                }"#,
            )
            .create_async()
            .await;

        let provider = provider_for(&server);
        let response = provider
            .generate(LlmRequest::new("How did I do?").with_system_prompt("Be kind"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "Great work today!");
        assert_eq!(response.tokens_used, Some(42));
        assert_eq!(response.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_generate_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": "rate limited"}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let err = provider.generate(LlmRequest::new("hi")).await.unwrap_err();
        assert_eq!(err.provider, "openai");
        assert!(err.message.contains("429"));
    }

    #[tokio::test]
    async fn test_generate_timeout_is_provider_error() {
        // A bound listener that never answers: the connection is accepted
        // into the backlog, the request is written, and no response comes.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let provider = OpenAiProvider::new(
            "test-api-key".to_string(),
            "gpt-4o-mini".to_string(),
            Some(url),
            Duration::from_millis(100),
        )
        .unwrap();

        let err = provider.generate(LlmRequest::new("hi")).await.unwrap_err();
        assert_eq!(err.to_string(), "openai: request timed out");
    }

    #[tokio::test]
    async fn test_generate_empty_completion_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let err = provider.generate(LlmRequest::new("hi")).await.unwrap_err();
        assert!(err.message.contains("empty completion"));
    }
}
