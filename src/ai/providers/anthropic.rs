//! Anthropic provider implementation.

use crate::ai::error::{AiError, AiResult, ProviderFailure};
use crate::ai::provider::{GenerationRequest, Provider, TextStream};
use crate::ai::stream::sse_text_stream;
use async_trait::async_trait;
use reqwest::Client;
use reqwest_eventsource::EventSource;
use serde_json::json;

/// Anthropic provider configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1/".to_string(),
        }
    }
}

/// General-purpose provider speaking the Anthropic messages API.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Environment variable for the API key.
    pub const API_KEY_ENV: &'static str = "ANTHROPIC_API_KEY";

    pub fn new(config: AnthropicConfig) -> AiResult<Self> {
        if config.api_key.is_empty() {
            return Err(AiError::MissingApiKey("anthropic".to_string()));
        }
        Ok(Self {
            config,
            client: Client::new(),
        })
    }

    /// Create provider from environment.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var(Self::API_KEY_ENV)
            .map_err(|_| AiError::MissingApiKey("anthropic".to_string()))?;
        Self::new(AnthropicConfig::new(api_key))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    async fn stream(&self, request: GenerationRequest) -> AiResult<TextStream> {
        let url = format!("{}messages", self.config.base_url);
        let body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": [{"role": "user", "content": request.prompt}],
            "stream": true,
        });

        let req_builder = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
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
