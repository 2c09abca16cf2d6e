//! LLM module - language model integrations
//!
//! Provides abstractions for different backends with Ollama as the primary.

use std::sync::Arc;

pub mod ollama;
pub mod openai;
pub mod traits;

pub use ollama::OllamaClient;
pub use openai::OpenAiCompatClient;
pub use traits::LlmProvider;

use crate::core::{Config, ProviderKind};

/// Create the provider selected by configuration
pub fn create_provider(config: &Config) -> Arc<dyn LlmProvider> {
    match config.provider {
        ProviderKind::Ollama => Arc::new(OllamaClient::from_config(config)),
        kind => Arc::new(OpenAiCompatClient::from_config(config, kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_ollama() {
        let config = Config::default();
        let provider = create_provider(&config);
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_factory_selects_openai() {
        let mut config = Config::default();
        config.provider = ProviderKind::OpenAi;
        let provider = create_provider(&config);
        assert_eq!(provider.name(), "openai");
    }
}
