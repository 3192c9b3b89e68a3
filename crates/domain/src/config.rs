//! Environment-driven configuration.
//!
//! Everything the pipeline needs to know is supplied externally: which
//! provider to use, its credential / base URL / model, the request timeout,
//! and the retry schedule. Only documented fallbacks are hard-coded.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Closed set of provider backends. Selection happens once, at
/// construction time, via the `llm` crate's factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Groq,
    /// Locally-hosted OpenAI-compatible endpoint (Ollama, LM Studio, ...).
    Local,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Groq => write!(f, "groq"),
            ProviderKind::Local => write!(f, "local"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "groq" => Ok(ProviderKind::Groq),
            "local" | "ollama" | "lmstudio" => Ok(ProviderKind::Local),
            _ => Err(anyhow!("Unsupported LLM_PROVIDER: {}", s)),
        }
    }
}

/// Static configuration handed to a provider at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint; required for `Local`.
    pub base_url: Option<String>,
    pub model: String,
    /// Upper bound for a single generation call. Exceeding it counts as one
    /// failed attempt against the retry budget.
    pub timeout: Duration,
}

/// Retry schedule for the feedback orchestrator: exponential backoff,
/// doubling from `initial_delay` up to `max_delay`, for at most
/// `max_attempts` calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        // 5 attempts on the 1-2-4-8-16s schedule.
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// Owner id stamped on entries created by the CLI.
    pub owner: String,
    pub provider: ProviderConfig,
    pub retry: RetrySettings,
    /// Optional free-text block appended verbatim to every prompt.
    pub profile_context: Option<String>,
}

impl Config {
    /// Load configuration from the environment, reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let db_path = env::var("DAYBOOK_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("daybook.db"));
        let owner = env::var("DAYBOOK_OWNER").unwrap_or_else(|_| "default".to_string());
        let profile_context = env::var("DAYBOOK_PROFILE").ok().filter(|s| !s.is_empty());

        let kind: ProviderKind = env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "openai".to_string())
            .parse()?;

        let timeout_secs = env_parse("LLM_TIMEOUT_SECS", 30u64)?;
        let provider = match kind {
            ProviderKind::OpenAi => ProviderConfig {
                kind,
                api_key: Some(require_env("OPENAI_API_KEY")?),
                base_url: env::var("LLM_BASE_URL").ok(),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            ProviderKind::Anthropic => ProviderConfig {
                kind,
                api_key: Some(require_env("ANTHROPIC_API_KEY")?),
                base_url: env::var("LLM_BASE_URL").ok(),
                model: env::var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|_| "claude-3-5-haiku-latest".to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            ProviderKind::Groq => ProviderConfig {
                kind,
                api_key: Some(require_env("GROQ_API_KEY")?),
                base_url: env::var("LLM_BASE_URL").ok(),
                model: env::var("GROQ_MODEL")
                    .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            ProviderKind::Local => ProviderConfig {
                kind,
                api_key: env::var("LOCAL_LLM_API_KEY").ok(),
                base_url: Some(
                    env::var("LOCAL_LLM_URL")
                        .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
                ),
                model: env::var("LOCAL_LLM_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
        };

        let defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_attempts: env_parse("LLM_MAX_ATTEMPTS", defaults.max_attempts)?,
            initial_delay: Duration::from_secs(env_parse(
                "LLM_INITIAL_BACKOFF_SECS",
                defaults.initial_delay.as_secs(),
            )?),
            max_delay: Duration::from_secs(env_parse(
                "LLM_MAX_BACKOFF_SECS",
                defaults.max_delay.as_secs(),
            )?),
        };

        Ok(Self {
            db_path,
            owner,
            provider,
            retry,
            profile_context,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| anyhow!("{} is not set (check your .env)", name))
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trip() {
        for kind in [
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::Groq,
            ProviderKind::Local,
        ] {
            let parsed: ProviderKind = kind.to_string().parse().expect("parses back");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_provider_kind_aliases() {
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Local);
        assert_eq!(
            "lmstudio".parse::<ProviderKind>().unwrap(),
            ProviderKind::Local
        );
        assert!("bedrock".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_default_retry_schedule() {
        let retry = RetrySettings::default();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_delay, Duration::from_secs(1));
        assert_eq!(retry.max_delay, Duration::from_secs(16));
    }
}
