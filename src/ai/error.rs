//! AI client error types.

use std::fmt;
use thiserror::Error;

/// Structured failure from a provider HTTP or stream call.
///
/// Carries everything the overload heuristic inspects: the HTTP status, an
/// explicit error-type tag, the type field of a nested error object, and the
/// raw message.
#[derive(Debug, Clone, Default)]
pub struct ProviderFailure {
    pub status: Option<u16>,
    /// Top-level `type` field of the error body, when present.
    pub error_type: Option<String>,
    /// `error.type` of a nested error object, when present.
    pub nested_type: Option<String>,
    pub message: String,
}

impl ProviderFailure {
    /// Build a failure from an HTTP status and response body, picking up
    /// `type` / `error.type` tags from a JSON body when it parses.
    pub fn from_http(status: u16, body: &str) -> Self {
        let mut failure = Self {
            status: Some(status),
            error_type: None,
            nested_type: None,
            message: body.to_string(),
        };
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            failure.error_type = value
                .get("type")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            if let Some(nested) = value.get("error") {
                failure.nested_type = nested
                    .get("type")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                if let Some(msg) = nested.get("message").and_then(|v| v.as_str()) {
                    failure.message = msg.to_string();
                }
            }
        }
        failure
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "provider error {}: {}", status, self.message),
            None => write!(f, "provider error: {}", self.message),
        }
    }
}

/// Errors raised by the provider layer.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("missing API key for provider {0}")]
    MissingApiKey(String),

    #[error("{0}")]
    Provider(ProviderFailure),

    #[error("stream error: {0}")]
    Stream(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl AiError {
    pub fn provider_error(failure: ProviderFailure) -> Self {
        AiError::Provider(failure)
    }

    pub fn stream_error(message: impl Into<String>) -> Self {
        AiError::Stream(message.into())
    }
}

/// Result type for provider operations.
pub type AiResult<T> = std::result::Result<T, AiError>;
