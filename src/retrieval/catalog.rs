//! In-memory schema catalog with lexical relevance scoring
//!
//! Loads table metadata from a JSON file and ranks tables against a query by
//! term overlap across table names, column names, and descriptions.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::core::{QueryForgeError, Result, TableMetadata};
use crate::retrieval::SchemaIndex;

/// Catalog file layout: either a bare array of tables or `{"tables": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped { tables: Vec<TableMetadata> },
    Bare(Vec<TableMetadata>),
}

/// Schema catalog backed by a flat list of table descriptors
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    tables: Vec<TableMetadata>,
}

impl SchemaCatalog {
    /// Build a catalog from already-loaded table metadata
    pub fn from_tables(tables: Vec<TableMetadata>) -> Self {
        Self { tables }
    }

    /// Load a catalog from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            QueryForgeError::retrieval(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;

        let file: CatalogFile = serde_json::from_str(&text).map_err(|e| {
            QueryForgeError::retrieval(format!("Invalid catalog {}: {}", path.display(), e))
        })?;

        let tables = match file {
            CatalogFile::Wrapped { tables } => tables,
            CatalogFile::Bare(tables) => tables,
        };

        debug!(tables = tables.len(), path = %path.display(), "loaded schema catalog");
        Ok(Self { tables })
    }

    /// Number of tables in the catalog
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the catalog holds no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn score(terms: &[String], table: &TableMetadata) -> usize {
        let mut score = 0;
        for term in terms {
            if token_match(&table.name, term) {
                score += 3;
            }
            if contains_term(&table.description, term) {
                score += 1;
            }
            for column in &table.columns {
                if token_match(&column.name, term) {
                    score += 2;
                }
                if contains_term(&column.description, term) {
                    score += 1;
                }
            }
        }
        score
    }
}

/// Split text into lowercase alphanumeric terms
fn terms_of(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Match a query term against an identifier, tolerating plural/singular drift
fn token_match(identifier: &str, term: &str) -> bool {
    terms_of(identifier)
        .iter()
        .any(|token| token == term || token.starts_with(term) || term.starts_with(token.as_str()))
}

fn contains_term(text: &str, term: &str) -> bool {
    text.to_lowercase().contains(term)
}

#[async_trait]
impl SchemaIndex for SchemaCatalog {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<TableMetadata>> {
        let terms = terms_of(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, &TableMetadata)> = self
            .tables
            .iter()
            .map(|table| (Self::score(&terms, table), table))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps catalog order for equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, table)| table.clone())
            .collect())
    }

    fn all_tables(&self) -> Vec<TableMetadata> {
        self.tables.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TableColumn;

    fn column(name: &str, data_type: &str, description: &str) -> TableColumn {
        TableColumn {
            name: name.to_string(),
            data_type: data_type.to_string(),
            description: description.to_string(),
            primary_key: false,
            nullable: true,
        }
    }

    fn sample_catalog() -> SchemaCatalog {
        SchemaCatalog::from_tables(vec![
            TableMetadata {
                schema: None,
                name: "customers".to_string(),
                description: "Registered customer accounts".to_string(),
                columns: vec![
                    column("id", "INTEGER", "Customer identifier"),
                    column("name", "TEXT", "Full name"),
                    column("city", "TEXT", "Billing city"),
                ],
            },
            TableMetadata {
                schema: None,
                name: "orders".to_string(),
                description: "Placed orders with totals".to_string(),
                columns: vec![
                    column("id", "INTEGER", "Order identifier"),
                    column("customer_id", "INTEGER", "Owning customer"),
                    column("total", "REAL", "Order total in dollars"),
                ],
            },
            TableMetadata {
                schema: None,
                name: "audit_log".to_string(),
                description: "Internal change history".to_string(),
                columns: vec![column("entry", "TEXT", "Raw entry")],
            },
        ])
    }

    #[tokio::test]
    async fn test_search_ranks_name_match_first() {
        let catalog = sample_catalog();
        let results = catalog.search("total spent by each customer", 5).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].name, "orders");
        assert!(results.iter().any(|t| t.name == "customers"));
        assert!(!results.iter().any(|t| t.name == "audit_log"));
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let catalog = sample_catalog();
        let results = catalog.search("customer orders", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let catalog = sample_catalog();
        let results = catalog.search("   ", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_tables_named_preserves_order() {
        let catalog = sample_catalog();
        let names = vec!["orders".to_string(), "customers".to_string()];
        let found = catalog.tables_named(&names);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "orders");
        assert_eq!(found[1].name, "customers");
    }

    #[test]
    fn test_from_file_wrapped_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{"tables": [{"name": "events", "description": "", "columns": []}]}"#,
        )
        .unwrap();

        let catalog = SchemaCatalog::from_file(&path).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_from_file_missing() {
        let err = SchemaCatalog::from_file("/nonexistent/catalog.json").unwrap_err();
        assert!(err.to_string().contains("catalog"));
    }
}
