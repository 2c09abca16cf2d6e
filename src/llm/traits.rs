//! LLM provider trait for abstracting different backends
//!
//! Enables swapping between Ollama, OpenAI-compatible servers, and vLLM.

use async_trait::async_trait;

use crate::core::Result;

/// Common interface for LLM backends
///
/// Providers are constructed from [`Config`](crate::core::Config) and carry
/// their model name and sampling parameters internally, so callers only
/// supply a prompt.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a prompt and return the model's complete text response
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check whether the backend is reachable
    async fn is_available(&self) -> Result<bool>;

    /// Provider name for logging and status display
    fn name(&self) -> &str;

    /// Model identifier this provider was configured with
    fn model(&self) -> &str;
}
