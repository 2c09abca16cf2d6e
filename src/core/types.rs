//! Shared types used across queryforge modules
//!
//! Contains conversation messages, execution records, and the schema
//! metadata descriptors exchanged between the retrieval, pipeline, and
//! agent layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single result row, keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
    /// When the message was recorded
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One logged tool invocation
///
/// Appended to agent memory for every tool call made during a turn, and
/// read back for status reports and memory summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Name of the tool that was invoked
    pub tool: String,
    /// Input parameters passed to the tool
    pub input: serde_json::Value,
    /// Output produced on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Error text when the call failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the call succeeded
    pub success: bool,
    /// When the call completed
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Record a successful tool call
    pub fn success(tool: impl Into<String>, input: serde_json::Value, output: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            input,
            output: Some(output),
            error: None,
            success: true,
            timestamp: Utc::now(),
        }
    }

    /// Record a failed tool call
    pub fn failure(tool: impl Into<String>, input: serde_json::Value, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            input,
            output: None,
            error: Some(error.into()),
            success: false,
            timestamp: Utc::now(),
        }
    }
}

/// Snapshot of agent memory for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySummary {
    /// Number of retained conversation messages
    pub message_count: usize,
    /// Number of recorded tool executions
    pub execution_count: usize,
    /// Free-form context entries (last query, tables touched, etc.)
    pub context: serde_json::Map<String, serde_json::Value>,
    /// Most recent tool execution, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<ExecutionRecord>,
}

/// A column within a catalogued table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name
    pub name: String,
    /// Declared data type (as the catalog records it)
    pub data_type: String,
    /// Business description of the column
    #[serde(default)]
    pub description: String,
    /// Whether the column is part of the primary key
    #[serde(default)]
    pub primary_key: bool,
    /// Whether the column accepts NULL
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// Descriptor for one table in the schema catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Owning schema, when the catalog records one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Table name
    pub name: String,
    /// Business description of the table
    #[serde(default)]
    pub description: String,
    /// Column descriptors
    #[serde(default)]
    pub columns: Vec<TableColumn>,
}

impl TableMetadata {
    /// Schema-qualified name (`schema.table`) when a schema is recorded
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Check whether a (possibly schema-qualified) name refers to this table
    pub fn matches_name(&self, name: &str) -> bool {
        let bare = name.rsplit('.').next().unwrap_or(name);
        self.name.eq_ignore_ascii_case(bare) || self.qualified_name().eq_ignore_ascii_case(name)
    }
}
