//! Model integration for Disha.
//!
//! The only backend is Gemini's `generateContent` REST endpoint, reached
//! through `GeminiProvider`. Everything else talks to the `LlmProvider`
//! trait so tests can substitute stubs.

pub mod gemini;
pub mod provider;
pub mod schema;

pub use gemini::GeminiProvider;
pub use provider::*;
pub use schema::{ResponseSchema, SchemaType};

use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `None` when no credential is configured; calls then fail fast.
    pub api_key: Option<secrecy::SecretString>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = GeminiProvider::new(config)?;
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set; model calls will fail with a configuration error");
    }
    tracing::info!("Using Gemini (model: {})", config.model);
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_with_key() {
        let config = LlmConfig {
            api_key: Some(secrecy::SecretString::from("test-key")),
            model: "gemini-2.5-flash".to_string(),
            base_url: gemini::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "gemini-2.5-flash");
        assert!(provider.has_credentials());
    }

    #[test]
    fn test_create_provider_without_key_still_constructs() {
        let config = LlmConfig {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: gemini::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        };
        let provider = create_provider(&config).unwrap();
        assert!(!provider.has_credentials());
    }
}
