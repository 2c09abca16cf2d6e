//! Configuration management for queryforge
//!
//! Supports environment variables, config files, and runtime overrides.
//! LLM providers and models are interchangeable via settings.
//!
//! Config file location: ~/.config/queryforge/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{QueryForgeError, Result};

/// Which LLM backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server
    Ollama,
    /// Hosted OpenAI API
    OpenAi,
    /// vLLM's OpenAI-compatible server
    Vllm,
}

impl ProviderKind {
    /// Parse a provider name as used in env vars and CLI flags
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "chatgpt" => Ok(Self::OpenAi),
            "vllm" => Ok(Self::Vllm),
            other => Err(QueryForgeError::config(format!(
                "unknown LLM provider '{}' (expected ollama, openai, or vllm)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Vllm => write!(f, "vllm"),
        }
    }
}

/// Main configuration for queryforge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which LLM backend to use
    pub provider: ProviderKind,
    /// LLM connection and generation settings
    pub llm: LlmConfig,
    /// Schema retrieval settings
    pub retrieval: RetrievalConfig,
    /// Output database settings
    pub database: DatabaseConfig,
    /// Agent loop behavior
    pub agent: AgentSettings,
}

/// LLM backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name passed to the backend
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate (backend default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Base URL of the Ollama server
    pub ollama_url: String,
    /// Base URL of the OpenAI-compatible API
    pub openai_base_url: String,
    /// Base URL of the vLLM OpenAI-compatible server
    pub vllm_url: String,
    /// API key for hosted backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Schema retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Path to the JSON schema catalog file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    /// How many candidate tables to retrieve per query
    pub top_k: usize,
}

/// Output database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database queries run against; no path disables
    /// execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// SQL dialect name fed into the generation prompt
    pub dialect: String,
}

/// Agent loop behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum conversation messages retained in memory
    /// Default: 50
    pub max_messages: usize,
    /// Default retry budget for the agent loop
    /// Default: 3
    pub max_iterations: usize,
    /// Whether generated SQL is executed unless overridden per call
    pub execute_by_default: bool,
    /// Whether to show debug output
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: env::var("QUERYFORGE_PROVIDER")
                .ok()
                .and_then(|p| ProviderKind::parse(&p).ok())
                .unwrap_or(ProviderKind::Ollama),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            database: DatabaseConfig::default(),
            agent: AgentSettings::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: env::var("QUERYFORGE_MODEL").unwrap_or_else(|_| "mistral-nemo:latest".to_string()),
            temperature: env::var("QUERYFORGE_TEMPERATURE")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0.7),
            max_tokens: env::var("QUERYFORGE_MAX_TOKENS")
                .ok()
                .and_then(|t| t.parse().ok()),
            ollama_url: env::var("OLLAMA_URL").unwrap_or_else(|_| "http://localhost:11434".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            vllm_url: env::var("VLLM_URL").unwrap_or_else(|_| "http://localhost:8000/v1".to_string()),
            api_key: env::var("OPENAI_API_KEY").ok(),
            timeout_secs: 120,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            catalog_path: env::var("QUERYFORGE_CATALOG").ok().map(PathBuf::from),
            top_k: 5,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: env::var("QUERYFORGE_DB").ok().map(PathBuf::from),
            dialect: env::var("QUERYFORGE_DIALECT").unwrap_or_else(|_| "sqlite".to_string()),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_messages: 50,
            max_iterations: 3,
            execute_by_default: false,
            debug: env::var("QUERYFORGE_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("queryforge")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        // Try to load from config file
        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        // Fall back to defaults (which respect env vars)
        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(QueryForgeError::config("config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| QueryForgeError::config(format!("failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| QueryForgeError::config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| QueryForgeError::config(format!("failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| QueryForgeError::config(format!("failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| QueryForgeError::config(format!("failed to write config: {}", e)))?;

        Ok(())
    }

    /// Check if a config file exists
    pub fn config_exists() -> bool {
        Self::config_file().exists()
    }

    /// Base URL of the configured provider
    pub fn provider_url(&self) -> &str {
        match self.provider {
            ProviderKind::Ollama => &self.llm.ollama_url,
            ProviderKind::OpenAi => &self.llm.openai_base_url,
            ProviderKind::Vllm => &self.llm.vllm_url,
        }
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent.max_messages, 50);
        assert_eq!(config.agent.max_iterations, 3);
        assert!(!config.agent.execute_by_default);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.database.dialect, "sqlite");
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(ProviderKind::parse("ollama").unwrap(), ProviderKind::Ollama);
        assert_eq!(ProviderKind::parse("ChatGPT").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::parse("vllm").unwrap(), ProviderKind::Vllm);
        assert!(ProviderKind::parse("bard").is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("provider"));
        assert!(toml_str.contains("max_iterations"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agent.max_iterations, config.agent.max_iterations);
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("queryforge"));
    }
}
