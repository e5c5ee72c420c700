//! AI provider layer: provider trait, registry, streaming, and the fallback
//! orchestrator.

pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod stream;

pub use error::{AiError, AiResult, ProviderFailure};
pub use orchestrator::{GenerationParams, Orchestrator};
pub use provider::{
    GenerationRequest, ProgressSink, Provider, ProviderRegistry, TextStream,
    default_overload_heuristic,
};
pub use providers::{AnthropicProvider, PerplexityProvider};

use crate::logging::Logger;

/// Build a registry from the environment: each provider is registered when
/// its API key is present. Registration order is fallback order.
pub fn registry_from_env(logger: &Logger) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    match AnthropicProvider::from_env() {
        Ok(provider) => registry = registry.register(provider),
        Err(e) => logger.debug(&format!("anthropic provider unavailable: {}", e)),
    }

    match PerplexityProvider::from_env() {
        Ok(provider) => registry = registry.register(provider),
        Err(e) => logger.debug(&format!("perplexity provider unavailable: {}", e)),
    }

    if registry.providers().is_empty() {
        logger.warn("no AI provider API keys found; AI-backed commands will fail");
    }

    registry
}
