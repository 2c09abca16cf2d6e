//! Built-in tools
//!
//! Constructors for the standard tool set, each closing over the shared
//! collaborator it needs. Handlers translate typed errors into envelope
//! strings so the registry's no-raise dispatch contract holds.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::core::Result;
use crate::llm::LlmProvider;
use crate::pipeline::{prompt, SqlPipeline};
use crate::sql::{validate_sql, QueryExecutor};
use crate::tools::registry::{Tool, ToolRegistry};

fn string_param(params: &Map<String, Value>, name: &str) -> std::result::Result<String, String> {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("parameter '{}' must be a string", name))
}

/// SQL generation from a natural-language query
pub fn generate_sql_tool(pipeline: Arc<SqlPipeline>) -> Tool {
    Tool::new(
        "generate_sql",
        "Generate SQL query from business requirements using schema retrieval",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language business query"
                }
            },
            "required": ["query"]
        }),
        vec!["query"],
        Arc::new(move |params| {
            let pipeline = Arc::clone(&pipeline);
            Box::pin(async move {
                let query = string_param(&params, "query")?;
                let sql = pipeline
                    .generate_sql(&query, None)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(Value::String(sql))
            })
        }),
    )
}

/// SQL execution against the configured database
pub fn execute_query_tool(executor: Option<Arc<dyn QueryExecutor>>) -> Tool {
    Tool::new(
        "execute_query",
        "Execute SQL query and return results",
        json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "SQL query to execute"
                }
            },
            "required": ["sql"]
        }),
        vec!["sql"],
        Arc::new(move |params| {
            let executor = executor.clone();
            Box::pin(async move {
                let sql = string_param(&params, "sql")?;
                let executor = executor.ok_or_else(|| "No database configured".to_string())?;
                let rows = executor.run(&sql).await.map_err(|e| e.to_string())?;
                Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
            })
        }),
    )
}

/// Table metadata lookup for a request
pub fn get_metadata_tool(pipeline: Arc<SqlPipeline>) -> Tool {
    Tool::new(
        "get_metadata",
        "Retrieve table metadata and schema information",
        json!({
            "type": "object",
            "properties": {
                "query_text": {
                    "type": "string",
                    "description": "Query to find related metadata"
                }
            },
            "required": ["query_text"]
        }),
        vec!["query_text"],
        Arc::new(move |params| {
            let pipeline = Arc::clone(&pipeline);
            Box::pin(async move {
                let query_text = string_param(&params, "query_text")?;
                let tables = pipeline
                    .related_tables(&query_text)
                    .await
                    .map_err(|e| e.to_string())?;
                serde_json::to_value(tables).map_err(|e| e.to_string())
            })
        }),
    )
}

/// Structural SQL validation
pub fn validate_sql_tool() -> Tool {
    Tool::new(
        "validate_sql",
        "Validate SQL query syntax and semantics",
        json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "SQL query to validate"
                }
            },
            "required": ["sql"]
        }),
        vec!["sql"],
        Arc::new(|params| {
            Box::pin(async move {
                let sql = string_param(&params, "sql")?;
                serde_json::to_value(validate_sql(&sql)).map_err(|e| e.to_string())
            })
        }),
    )
}

/// Business-terms explanation of a SQL statement
pub fn explain_query_tool(llm: Arc<dyn LlmProvider>) -> Tool {
    Tool::new(
        "explain_query",
        "Explain what a SQL query does in business terms",
        json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "SQL query to explain"
                }
            },
            "required": ["sql"]
        }),
        vec!["sql"],
        Arc::new(move |params| {
            let llm = Arc::clone(&llm);
            Box::pin(async move {
                let sql = string_param(&params, "sql")?;
                let explanation = llm
                    .complete(&prompt::explain_prompt(&sql))
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(Value::String(explanation))
            })
        }),
    )
}

/// Register the standard tool set
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    pipeline: Arc<SqlPipeline>,
    executor: Option<Arc<dyn QueryExecutor>>,
    llm: Arc<dyn LlmProvider>,
) -> Result<()> {
    registry.register(generate_sql_tool(Arc::clone(&pipeline)))?;
    registry.register(execute_query_tool(executor))?;
    registry.register(get_metadata_tool(pipeline))?;
    registry.register(validate_sql_tool())?;
    registry.register(explain_query_tool(llm))?;
    Ok(())
}
