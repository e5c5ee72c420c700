//! Provider call orchestration.
//!
//! Each generation call runs an explicit state machine:
//!
//! ```text
//! Select -> Call -> Done
//!             |
//!             v (overload only)
//!       RetryWithFallback -> Select (attempts remain)
//!             |
//!             v
//!           Failed
//! ```
//!
//! Non-overload errors abort immediately from Call and are never retried.

use super::provider::{GenerationRequest, ProgressSink, Provider, ProviderRegistry};
use super::stream::collect_stream;
use crate::config::AiConfig;
use crate::error::{EngineError, EngineResult};
use crate::logging::Logger;
use std::collections::HashSet;
use std::sync::Arc;

/// A generation call before provider selection.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub system: String,
    pub prompt: String,
    /// Prefer a web-search-augmented provider.
    pub research: bool,
}

/// Per-call state. Transitions are enumerated in the `generate` loop; the
/// "never retry non-overload errors" rule is the absence of an edge from
/// Call back to Select on such errors.
enum CallState {
    Select,
    Call(Arc<dyn Provider>),
    RetryWithFallback,
    Failed,
    Done(String),
}

/// Drives provider selection, streaming calls, and deterministic fallback on
/// capacity errors.
pub struct Orchestrator {
    registry: ProviderRegistry,
    config: AiConfig,
}

impl Orchestrator {
    pub fn new(registry: ProviderRegistry, config: AiConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Pick the next provider: research-capable providers first for research
    /// requests, skipping providers already seen overloading. When every
    /// candidate has overloaded, the preferred provider is retried; the
    /// attempt limit bounds the total number of calls.
    fn select_provider(
        &self,
        research: bool,
        overloaded: &HashSet<String>,
    ) -> Option<Arc<dyn Provider>> {
        let pool = self.registry.providers();
        if pool.is_empty() {
            return None;
        }

        let mut ordered: Vec<Arc<dyn Provider>> = Vec::with_capacity(pool.len());
        if research {
            ordered.extend(pool.iter().filter(|p| p.supports_research()).cloned());
            ordered.extend(pool.iter().filter(|p| !p.supports_research()).cloned());
        } else {
            ordered.extend(pool.iter().filter(|p| !p.supports_research()).cloned());
            ordered.extend(pool.iter().filter(|p| p.supports_research()).cloned());
        }

        ordered
            .iter()
            .find(|p| !overloaded.contains(p.provider_id()))
            .cloned()
            .or_else(|| ordered.first().cloned())
    }

    fn request_for(&self, provider: &Arc<dyn Provider>, params: &GenerationParams) -> GenerationRequest {
        let model = if provider.supports_research() {
            self.config.research_model.clone()
        } else {
            self.config.model.clone()
        };
        GenerationRequest {
            model,
            system: params.system.clone(),
            prompt: params.prompt.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Run one generation call through the fallback state machine, returning
    /// the accumulated response text.
    pub async fn generate(
        &self,
        params: &GenerationParams,
        progress: Option<&dyn ProgressSink>,
        logger: &Logger,
    ) -> EngineResult<String> {
        if self.registry.providers().is_empty() {
            return Err(EngineError::provider_failure(
                "no AI providers are configured",
            ));
        }

        let mut overloaded: HashSet<String> = HashSet::new();
        let mut attempts: u32 = 0;
        let mut warned_research = false;
        let mut state = CallState::Select;

        loop {
            state = match state {
                CallState::Select => match self.select_provider(params.research, &overloaded) {
                    Some(provider) => {
                        if params.research && !provider.supports_research() && !warned_research {
                            logger.warn(
                                "research requested but no research-capable provider is available; continuing with the general provider",
                            );
                            warned_research = true;
                        }
                        CallState::Call(provider)
                    }
                    None => CallState::Failed,
                },

                CallState::Call(provider) => {
                    attempts += 1;
                    logger.debug(&format!(
                        "calling provider {} (attempt {}/{})",
                        provider.provider_id(),
                        attempts,
                        self.config.max_attempts
                    ));

                    let request = self.request_for(&provider, params);
                    let result = match provider.stream(request).await {
                        Ok(stream) => {
                            collect_stream(stream, self.config.max_tokens, progress).await
                        }
                        Err(e) => Err(e),
                    };

                    match result {
                        Ok(text) => CallState::Done(text),
                        Err(err) if provider.is_overload(&err) => {
                            logger.warn(&format!(
                                "provider {} reported overload: {}",
                                provider.provider_id(),
                                err
                            ));
                            overloaded.insert(provider.provider_id().to_string());
                            CallState::RetryWithFallback
                        }
                        Err(err) => return Err(EngineError::provider_failure(err)),
                    }
                }

                CallState::RetryWithFallback => {
                    if attempts >= self.config.max_attempts {
                        CallState::Failed
                    } else {
                        CallState::Select
                    }
                }

                CallState::Failed => return Err(EngineError::fallback_exhausted(attempts)),

                CallState::Done(text) => {
                    logger.debug(&format!("received {} bytes from provider", text.len()));
                    return Ok(text);
                }
            };
        }
    }
}
