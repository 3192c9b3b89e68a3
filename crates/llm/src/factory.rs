use std::sync::Arc;

use anyhow::{anyhow, Result};
use domain::{ProviderConfig, ProviderKind};

use crate::providers::{
    AnthropicProvider, GroqProvider, LlmProvider, LocalProvider, OpenAiProvider,
};

/// Build the configured provider. Selection happens here, once; the
/// orchestrator only ever sees the trait object.
pub fn provider_from_config(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.kind {
        ProviderKind::OpenAi => {
            let api_key = require_api_key(config)?;
            let provider = OpenAiProvider::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                config.timeout,
            )?;
            Ok(Arc::new(provider))
        }
        ProviderKind::Anthropic => {
            let api_key = require_api_key(config)?;
            let provider = AnthropicProvider::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                config.timeout,
            )?;
            Ok(Arc::new(provider))
        }
        ProviderKind::Groq => {
            let api_key = require_api_key(config)?;
            let provider = GroqProvider::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                config.timeout,
            )?;
            Ok(Arc::new(provider))
        }
        ProviderKind::Local => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("Local provider requires a base URL"))?;
            let provider = LocalProvider::new(
                base_url,
                config.model.clone(),
                config.api_key.clone(),
                config.timeout,
            )?;
            Ok(Arc::new(provider))
        }
    }
}

fn require_api_key(config: &ProviderConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .ok_or_else(|| anyhow!("{} provider requires an API key", config.kind))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(kind: ProviderKind, api_key: Option<&str>, base_url: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            kind,
            api_key: api_key.map(str::to_string),
            base_url: base_url.map(str::to_string),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_create_each_provider_kind() {
        for (kind, base_url) in [
            (ProviderKind::OpenAi, None),
            (ProviderKind::Anthropic, None),
            (ProviderKind::Groq, None),
            (ProviderKind::Local, Some("http://localhost:11434/v1")),
        ] {
            let provider =
                provider_from_config(&config(kind, Some("test-key"), base_url)).unwrap();
            assert_eq!(provider.id().provider, kind.to_string());
            assert_eq!(provider.id().model, "test-model");
        }
    }

    #[test]
    fn test_hosted_providers_require_api_key() {
        for kind in [
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::Groq,
        ] {
            let result = provider_from_config(&config(kind, None, None));
            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().contains("API key"));
        }
    }

    #[test]
    fn test_local_requires_base_url_but_not_key() {
        assert!(provider_from_config(&config(ProviderKind::Local, None, None)).is_err());
        assert!(provider_from_config(&config(
            ProviderKind::Local,
            None,
            Some("http://localhost:11434/v1"),
        ))
        .is_ok());
    }
}
