//! Provider implementations.

pub mod anthropic;
pub mod perplexity;

pub use anthropic::AnthropicProvider;
pub use perplexity::PerplexityProvider;
