//! Pipeline module - retrieval-augmented SQL generation
//!
//! Two LLM steps: pick the relevant tables for a request, then generate SQL
//! against just those tables' metadata. A failed structured parse falls back
//! to a simplified retry prompt before giving up.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{QueryForgeError, Result, TableMetadata};
use crate::llm::LlmProvider;
use crate::retrieval::SchemaIndex;

pub mod extract;
pub mod prompt;

/// How much metadata the simplified retry prompt carries
const RETRY_METADATA_CHARS: usize = 1000;

/// Retrieval-augmented SQL generation pipeline
pub struct SqlPipeline {
    llm: Arc<dyn LlmProvider>,
    index: Arc<dyn SchemaIndex>,
    dialect: String,
    top_k: usize,
}

impl SqlPipeline {
    /// Create a pipeline over the given provider and schema index
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn SchemaIndex>,
        dialect: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            llm,
            index,
            dialect: dialect.into(),
            top_k,
        }
    }

    /// SQL dialect this pipeline generates for
    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    /// Find the tables relevant to a request
    ///
    /// Retrieves candidates from the index, then asks the model to narrow
    /// them down. If the model's selection cannot be parsed or names no known
    /// table, the retrieval candidates are used as-is rather than failing
    /// the whole turn.
    pub async fn related_tables(&self, query_text: &str) -> Result<Vec<TableMetadata>> {
        let candidates = self.index.search(query_text, self.top_k).await?;
        if candidates.is_empty() {
            debug!(query = query_text, "no candidate tables for query");
            return Ok(Vec::new());
        }

        let context = candidates
            .iter()
            .map(|t| format!("{}: {}", t.qualified_name(), t.description))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = prompt::table_selection_prompt(&context, query_text);
        let raw = self.llm.complete(&prompt).await?;
        debug!(response_chars = raw.len(), "table selection response");

        let names = extract::extract_tables(&raw);
        if names.is_empty() {
            warn!("model selected no tables, falling back to retrieval candidates");
            return Ok(candidates);
        }

        let selected = self.index.tables_named(&names);
        if selected.is_empty() {
            warn!(?names, "selected tables not in catalog, falling back to candidates");
            return Ok(candidates);
        }

        Ok(selected)
    }

    /// Generate a SQL statement for a natural-language request
    ///
    /// `analysis` is an optional upstream breakdown of the request that gets
    /// embedded in the prompt when present.
    pub async fn generate_sql(&self, query_text: &str, analysis: Option<&str>) -> Result<String> {
        let tables = self.related_tables(query_text).await?;
        if tables.is_empty() {
            return Err(QueryForgeError::retrieval(
                "No table metadata found for query",
            ));
        }

        let metadata = format_metadata_block(&tables);
        let prompt = prompt::sql_prompt(&metadata, query_text, &self.dialect, analysis);

        let raw = self.llm.complete(&prompt).await?;
        if let Some(sql) = extract::extract_sql(&raw) {
            debug!(sql = %sql, "generated SQL");
            return Ok(sql);
        }

        // Smaller models ignore the structured prompt; retry once simplified
        warn!("could not extract SQL, retrying with simplified prompt");
        let truncated: String = metadata.chars().take(RETRY_METADATA_CHARS).collect();
        let retry_prompt = prompt::simplified_sql_prompt(&truncated, query_text);

        let raw = self.llm.complete(&retry_prompt).await?;
        if let Some(sql) = extract::extract_sql(&raw) {
            debug!(sql = %sql, "generated SQL on retry");
            return Ok(sql);
        }

        Err(QueryForgeError::llm(
            "Could not extract SQL from model response",
        ))
    }
}

/// Render table metadata as the prompt block the SQL template expects
pub fn format_metadata_block(tables: &[TableMetadata]) -> String {
    let mut block = String::new();
    for table in tables {
        block.push_str(&format!("Table: {}\n", table.qualified_name()));
        if !table.description.is_empty() {
            block.push_str(&format!("Description: {}\n", table.description));
        }
        for column in &table.columns {
            block.push_str(&format!(
                "Column: {}, Type: {}{}{}\n",
                column.name,
                column.data_type,
                if column.primary_key { ", PK" } else { "" },
                if column.description.is_empty() {
                    String::new()
                } else {
                    format!(", Description: {}", column.description)
                },
            ));
        }
        block.push('\n');
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TableColumn;
    use crate::retrieval::SchemaCatalog;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that replays a scripted sequence of responses
    struct ScriptedLlm {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            let mut responses = self.responses.lock().unwrap();
            responses
                .pop_front()
                .ok_or_else(|| QueryForgeError::llm("script exhausted"))
        }

        async fn is_available(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn orders_catalog() -> Arc<SchemaCatalog> {
        Arc::new(SchemaCatalog::from_tables(vec![TableMetadata {
            schema: None,
            name: "orders".to_string(),
            description: "Placed orders".to_string(),
            columns: vec![TableColumn {
                name: "total".to_string(),
                data_type: "REAL".to_string(),
                description: "Order total".to_string(),
                primary_key: false,
                nullable: true,
            }],
        }]))
    }

    #[tokio::test]
    async fn test_generate_sql_happy_path() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            r#"{"tables": ["orders"]}"#,
            r#"{"sql": "SELECT SUM(total) FROM orders;"}"#,
        ]));
        let pipeline = SqlPipeline::new(llm, orders_catalog(), "sqlite", 5);

        let sql = pipeline.generate_sql("total order value", None).await.unwrap();
        assert_eq!(sql, "SELECT SUM(total) FROM orders;");
    }

    #[tokio::test]
    async fn test_generate_sql_retries_simplified() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            r#"{"tables": ["orders"]}"#,
            "I am not able to produce JSON right now.",
            r#"{"sql": "SELECT * FROM orders"}"#,
        ]));
        let pipeline = SqlPipeline::new(llm, orders_catalog(), "sqlite", 5);

        let sql = pipeline.generate_sql("all orders", None).await.unwrap();
        assert_eq!(sql, "SELECT * FROM orders");
    }

    #[tokio::test]
    async fn test_generate_sql_empty_catalog() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let catalog = Arc::new(SchemaCatalog::from_tables(Vec::new()));
        let pipeline = SqlPipeline::new(llm, catalog, "sqlite", 5);

        let err = pipeline.generate_sql("anything", None).await.unwrap_err();
        assert!(err.to_string().contains("No table metadata"));
    }

    #[tokio::test]
    async fn test_related_tables_falls_back_to_candidates() {
        let llm = Arc::new(ScriptedLlm::new(vec!["no tables come to mind"]));
        let pipeline = SqlPipeline::new(llm, orders_catalog(), "sqlite", 5);

        let tables = pipeline.related_tables("order totals").await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "orders");
    }

    #[test]
    fn test_format_metadata_block() {
        let catalog = orders_catalog();
        let block = format_metadata_block(&catalog.all_tables());
        assert!(block.contains("Table: orders"));
        assert!(block.contains("Column: total, Type: REAL"));
    }
}
