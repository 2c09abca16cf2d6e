//! Custom error types for queryforge
//!
//! Provides a unified error handling system across all modules.
//!
//! Query-level failures (invalid SQL, a rejected execution, an exhausted
//! retry budget) are values returned in result envelopes, not errors. The
//! variants here cover collaborator failures and caller contract
//! violations, the only things that propagate as `Err`.

use thiserror::Error;

/// Main error type for queryforge operations
#[derive(Error, Debug)]
pub enum QueryForgeError {
    /// LLM backend connection or API errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Schema retrieval errors
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Database execution errors
    #[error("database error: {0}")]
    Database(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// The agent was asked to process an empty query
    #[error("query must not be empty")]
    EmptyQuery,

    /// run() was called while the runner is not ready
    #[error("runner is not ready (state: {0})")]
    RunnerBusy(String),

    /// resume() was called on a stopped runner
    #[error("cannot resume a stopped runner; call reset() first")]
    RunnerStopped,

    /// run() was called with max_iterations == 0
    #[error("max_iterations must be at least 1")]
    InvalidIterations,

    /// A tool with this name is already registered
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    /// No tool registered under this name
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// A tool call was missing required parameters
    #[error("tool '{tool}' missing required parameters: {missing:?}")]
    MissingParameters { tool: String, missing: Vec<String> },

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite errors from the embedded executor
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Convenience Result type for queryforge operations
pub type Result<T> = std::result::Result<T, QueryForgeError>;

impl QueryForgeError {
    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a retrieval error
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
