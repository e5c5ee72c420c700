//! Perplexity provider implementation.
//!
//! Completions are augmented with live web search, so this provider backs
//! research-flagged requests. The wire format is OpenAI-compatible SSE.

use crate::ai::error::{AiError, AiResult, ProviderFailure};
use crate::ai::provider::{GenerationRequest, Provider, TextStream};
use crate::ai::stream::sse_text_stream;
use async_trait::async_trait;
use reqwest::Client;
use reqwest_eventsource::EventSource;
use serde_json::json;

/// Perplexity provider configuration.
#[derive(Debug, Clone)]
pub struct PerplexityConfig {
    pub api_key: String,
    pub base_url: String,
}

impl PerplexityConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.perplexity.ai/".to_string(),
        }
    }
}

/// Research (web-search-augmented) provider.
pub struct PerplexityProvider {
    config: PerplexityConfig,
    client: Client,
}

impl PerplexityProvider {
    /// Environment variable for the API key.
    pub const API_KEY_ENV: &'static str = "PERPLEXITY_API_KEY";

    pub fn new(config: PerplexityConfig) -> AiResult<Self> {
        if config.api_key.is_empty() {
            return Err(AiError::MissingApiKey("perplexity".to_string()));
        }
        Ok(Self {
            config,
            client: Client::new(),
        })
    }

    /// Create provider from environment.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var(Self::API_KEY_ENV)
            .map_err(|_| AiError::MissingApiKey("perplexity".to_string()))?;
        Self::new(PerplexityConfig::new(api_key))
    }
}

#[async_trait]
impl Provider for PerplexityProvider {
    fn provider_id(&self) -> &str {
        "perplexity"
    }

    fn supports_research(&self) -> bool {
        true
    }

    async fn stream(&self, request: GenerationRequest) -> AiResult<TextStream> {
        let url = format!("{}chat/completions", self.config.base_url);
        let body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "stream": true,
        });

        let req_builder = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&body);

        let event_source = EventSource::new(req_builder).map_err(|e| {
            AiError::provider_error(ProviderFailure {
                status: None,
                error_type: None,
                nested_type: None,
                message: format!("failed to open event source: {}", e),
            })
        })?;

        Ok(sse_text_stream(event_source))
    }
}
