//! OpenAI-compatible chat client
//!
//! Covers the hosted OpenAI API and self-hosted vLLM servers, which expose
//! the same `/chat/completions` surface.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{Config, ProviderKind, QueryForgeError, Result};
use crate::llm::traits::LlmProvider;

/// Client for OpenAI-compatible chat completion APIs
#[derive(Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    label: &'static str,
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Message in a chat completion request
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

/// Single choice in a chat completion response
#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

/// Message in a chat completion response
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiCompatClient {
    /// Create a client from configuration for the given provider kind
    pub fn from_config(config: &Config, kind: ProviderKind) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        let (base_url, label) = match kind {
            ProviderKind::Vllm => (config.llm.vllm_url.clone(), "vllm"),
            _ => (config.llm.openai_base_url.clone(), "openai"),
        };

        Self {
            client,
            base_url,
            api_key: config.llm.api_key.clone(),
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            label,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> QueryForgeError {
        if e.is_connect() {
            QueryForgeError::llm(format!(
                "Cannot connect to {} at {}",
                self.label, self.base_url
            ))
        } else {
            QueryForgeError::from(e)
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            provider = self.label,
            model = %self.model,
            prompt_chars = prompt.len(),
            "chat completion request"
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);

        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(QueryForgeError::llm(format!(
                "{} API error ({}): {}",
                self.label, status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| QueryForgeError::llm(format!("Failed to parse response: {}", e)))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| QueryForgeError::llm("Response contained no choices"))?;

        Ok(choice.message.content)
    }

    async fn is_available(&self) -> Result<bool> {
        let mut builder = self.client.get(format!("{}/models", self.base_url));

        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        match builder.send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        self.label
    }

    fn model(&self) -> &str {
        &self.model
    }
}
