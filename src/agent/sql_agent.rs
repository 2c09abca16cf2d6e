//! SQL agent
//!
//! Owns one natural-language-to-SQL turn: analyze the request, generate a
//! statement through the pipeline, validate it, and optionally execute it.
//! Query-level failures (bad SQL, a failed execution) come back inside the
//! turn result; `Err` is reserved for caller contract violations.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::agent::memory::AgentMemory;
use crate::core::{
    ExecutionRecord, MemorySummary, Message, QueryForgeError, Result, Row, TableMetadata,
};
use crate::llm::LlmProvider;
use crate::pipeline::{prompt, SqlPipeline};
use crate::sql::{validate_sql, QueryExecutor, ValidationReport};

/// Agent lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// Waiting for a query
    Idle,
    /// Analyzing the request
    Thinking,
    /// Generating, validating, or running SQL
    Executing,
    /// Turn finished with a generated statement
    Completed,
    /// Turn finished without one
    Error,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentState::Idle => "idle",
            AgentState::Thinking => "thinking",
            AgentState::Executing => "executing",
            AgentState::Completed => "completed",
            AgentState::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Result of a single agent turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    /// Whether the turn produced usable SQL (and results, when requested)
    pub success: bool,
    /// Generated SQL, present whenever generation succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Validation report for the generated SQL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    /// Result rows when the statement was executed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    /// Analysis from the thinking phase, when it succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Whether the statement actually ran against the database
    pub executed: bool,
    /// What went wrong on a failed turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Converts natural-language requests into SQL, with memory across turns
pub struct SqlAgent {
    llm: Arc<dyn LlmProvider>,
    pipeline: Arc<SqlPipeline>,
    executor: Option<Arc<dyn QueryExecutor>>,
    memory: AgentMemory,
    state: AgentState,
}

impl SqlAgent {
    /// Create an agent with the default memory window
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        pipeline: Arc<SqlPipeline>,
        executor: Option<Arc<dyn QueryExecutor>>,
    ) -> Self {
        Self {
            llm,
            pipeline,
            executor,
            memory: AgentMemory::new(),
            state: AgentState::Idle,
        }
    }

    /// Create an agent retaining at most `max_messages` conversation messages
    pub fn with_memory_window(
        llm: Arc<dyn LlmProvider>,
        pipeline: Arc<SqlPipeline>,
        executor: Option<Arc<dyn QueryExecutor>>,
        max_messages: usize,
    ) -> Self {
        Self {
            llm,
            pipeline,
            executor,
            memory: AgentMemory::with_window(max_messages),
            state: AgentState::Idle,
        }
    }

    /// Analyze a request before generating SQL
    ///
    /// Records the request in conversation memory and returns the model's
    /// breakdown of tables, intent, and constraints.
    pub async fn think(&mut self, user_query: &str) -> Result<String> {
        self.state = AgentState::Thinking;
        self.memory.add_message(Message::user(user_query));
        self.memory.set_context("last_query", json!(user_query));

        let analysis = self.llm.complete(&prompt::thinking_prompt(user_query)).await?;
        info!(chars = analysis.len(), "analysis complete");
        Ok(analysis)
    }

    /// Run one full turn: think, generate, validate, optionally execute
    ///
    /// A failed thinking phase is downgraded to a missing analysis; the turn
    /// proceeds without it. Set `should_run` to execute the validated SQL
    /// against the configured database.
    pub async fn execute(&mut self, user_query: &str, should_run: bool) -> Result<TurnResult> {
        let query = user_query.trim().to_string();
        if query.is_empty() {
            return Err(QueryForgeError::EmptyQuery);
        }

        let thinking = match self.think(&query).await {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!(error = %e, "thinking phase failed, continuing without analysis");
                None
            }
        };

        self.state = AgentState::Executing;

        let sql = match self.pipeline.generate_sql(&query, thinking.as_deref()).await {
            Ok(sql) => sql,
            Err(e) => {
                let error = e.to_string();
                self.memory.add_execution(ExecutionRecord::failure(
                    "generate_sql",
                    json!({ "query": query }),
                    &error,
                ));
                self.state = AgentState::Error;
                return Ok(TurnResult {
                    success: false,
                    sql: None,
                    validation: None,
                    rows: None,
                    thinking,
                    executed: false,
                    error: Some(error),
                });
            }
        };

        info!(sql = %sql, "generated SQL");
        self.memory.add_execution(ExecutionRecord::success(
            "generate_sql",
            json!({ "query": query }),
            Value::String(sql.clone()),
        ));
        self.memory
            .add_message(Message::assistant(format!("SQL Query: {}", sql)));
        self.memory.set_context("last_sql", json!(sql.clone()));

        let validation = validate_sql(&sql);

        if !validation.syntax_valid {
            let error = format!("SQL validation failed: {}", validation.issues.join("; "));
            self.memory.add_execution(ExecutionRecord::failure(
                "validate_sql",
                json!({ "sql": sql.clone() }),
                &error,
            ));
            self.state = AgentState::Error;
            return Ok(TurnResult {
                success: false,
                sql: Some(sql),
                validation: Some(validation),
                rows: None,
                thinking,
                executed: false,
                error: Some(error),
            });
        }

        self.memory.add_execution(ExecutionRecord::success(
            "validate_sql",
            json!({ "sql": sql.clone() }),
            serde_json::to_value(&validation)?,
        ));

        let mut rows = None;
        let mut executed = false;
        if should_run {
            match self.run_sql(&sql).await {
                Ok(result_rows) => {
                    self.memory.add_execution(ExecutionRecord::success(
                        "execute_query",
                        json!({ "sql": sql.clone() }),
                        json!({ "rows": result_rows.len() }),
                    ));
                    rows = Some(result_rows);
                    executed = true;
                }
                Err(e) => {
                    let error = e.to_string();
                    self.memory.add_execution(ExecutionRecord::failure(
                        "execute_query",
                        json!({ "sql": sql.clone() }),
                        &error,
                    ));
                    // The statement itself is sound; only the execution failed
                    self.state = AgentState::Completed;
                    return Ok(TurnResult {
                        success: false,
                        sql: Some(sql),
                        validation: Some(validation),
                        rows: None,
                        thinking,
                        executed: false,
                        error: Some(error),
                    });
                }
            }
        }

        self.state = AgentState::Completed;
        Ok(TurnResult {
            success: true,
            sql: Some(sql),
            validation: Some(validation),
            rows,
            thinking,
            executed,
            error: None,
        })
    }

    /// Run a statement against the configured database
    pub async fn run_sql(&self, sql: &str) -> Result<Vec<Row>> {
        match &self.executor {
            Some(executor) => executor.run(sql).await,
            None => Err(QueryForgeError::database("No database configured")),
        }
    }

    /// Validate a statement without running a turn
    pub fn validate(&self, sql: &str) -> ValidationReport {
        validate_sql(sql)
    }

    /// Explain a SQL statement in business terms
    pub async fn explain_query(&mut self, sql: &str) -> Result<String> {
        match self.llm.complete(&prompt::explain_prompt(sql)).await {
            Ok(text) => {
                self.memory.add_execution(ExecutionRecord::success(
                    "explain_query",
                    json!({ "sql": sql }),
                    Value::String(text.clone()),
                ));
                Ok(text)
            }
            Err(e) => {
                self.memory.add_execution(ExecutionRecord::failure(
                    "explain_query",
                    json!({ "sql": sql }),
                    e.to_string(),
                ));
                Err(e)
            }
        }
    }

    /// Look up the tables relevant to a request
    pub async fn table_metadata(&mut self, query_text: &str) -> Result<Vec<TableMetadata>> {
        match self.pipeline.related_tables(query_text).await {
            Ok(tables) => {
                let names: Vec<String> = tables.iter().map(|t| t.qualified_name()).collect();
                self.memory.add_execution(ExecutionRecord::success(
                    "get_metadata",
                    json!({ "query_text": query_text }),
                    json!(names),
                ));
                Ok(tables)
            }
            Err(e) => {
                self.memory.add_execution(ExecutionRecord::failure(
                    "get_metadata",
                    json!({ "query_text": query_text }),
                    e.to_string(),
                ));
                Err(e)
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Read access to conversation and execution memory
    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    /// Snapshot of memory for status reporting
    pub fn memory_summary(&self) -> MemorySummary {
        self.memory.summary()
    }

    /// Clear memory and return to idle
    pub fn reset(&mut self) {
        self.memory.clear();
        self.state = AgentState::Idle;
        info!("agent reset");
    }
}
