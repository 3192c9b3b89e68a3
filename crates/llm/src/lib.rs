//! Provider-abstracted LLM clients.
//!
//! One capability, `generate`, behind the [`LlmProvider`] trait; four
//! interchangeable implementations (OpenAI, Anthropic, Groq, and a local
//! OpenAI-compatible endpoint) selected once at construction time by the
//! factory. Providers are stateless between calls and report every failure
//! as a single [`ProviderError`] — retry policy belongs to the caller.

pub mod factory;
pub mod providers;

pub use factory::provider_from_config;
pub use providers::{
    AnthropicProvider, GroqProvider, LlmProvider, LlmRequest, LlmResponse, LocalProvider,
    OpenAiProvider, ProviderError, ProviderId,
};
