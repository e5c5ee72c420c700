//! Provider trait and registry.

use super::error::{AiError, AiResult};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// A single generation call, already resolved to a concrete model.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Stream of accumulated text deltas from a provider.
pub type TextStream = Pin<Box<dyn Stream<Item = AiResult<String>> + Send>>;

/// Default overload classification: an explicit error-type tag, a nested
/// error-object type field, HTTP 429/529, or a case-insensitive substring
/// match on "overloaded".
///
/// This is a documented approximation, not an exact contract; providers with
/// different capacity signals should override [`Provider::is_overload`].
pub fn default_overload_heuristic(err: &AiError) -> bool {
    match err {
        AiError::Provider(failure) => {
            matches!(failure.status, Some(429) | Some(529))
                || failure.error_type.as_deref() == Some("overloaded_error")
                || failure.nested_type.as_deref() == Some("overloaded_error")
                || failure.message.to_lowercase().contains("overloaded")
        }
        _ => false,
    }
}

/// An AI completion capability. The engine treats this as opaque: it only
/// cares whether a call yields text deltas or an overload-shaped error.
#[async_trait]
pub trait Provider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Whether completions are augmented with live web search.
    fn supports_research(&self) -> bool {
        false
    }

    /// Issue a streamed generation call.
    async fn stream(&self, request: GenerationRequest) -> AiResult<TextStream>;

    /// Classify an error as a capacity overload (triggers fallback) versus
    /// anything else (surfaced immediately, never retried).
    fn is_overload(&self, err: &AiError) -> bool {
        default_overload_heuristic(err)
    }
}

/// Registry of provider implementations. Registration order is the fallback
/// order.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Returns `self` for chaining.
    pub fn register<P: Provider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Look up a provider by ID.
    pub fn get_provider(&self, id: &str) -> AiResult<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.provider_id() == id)
            .cloned()
            .ok_or_else(|| AiError::stream_error(format!("provider not registered: {}", id)))
    }

    /// All providers in registration order.
    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    /// List all registered provider IDs.
    pub fn list_providers(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|p| p.provider_id().to_string())
            .collect()
    }
}

/// Optional sink receiving heuristic generation progress.
///
/// The value is `(bytes received / configured max token budget) x 100`, an
/// approximation rather than a true completion percentage.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: f64);
}
