//! Retrieval module - schema catalog search
//!
//! Finds the table descriptions most relevant to a natural-language query so
//! prompts only carry the slice of the schema the model actually needs.

use async_trait::async_trait;

use crate::core::{Result, TableMetadata};

pub mod catalog;

pub use catalog::SchemaCatalog;

/// Searchable index over table metadata
#[async_trait]
pub trait SchemaIndex: Send + Sync {
    /// Return the tables most relevant to `query`, best match first
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<TableMetadata>>;

    /// All tables the index knows about
    fn all_tables(&self) -> Vec<TableMetadata>;

    /// Look up tables by name, preserving the order of `names`
    fn tables_named(&self, names: &[String]) -> Vec<TableMetadata> {
        let mut found = Vec::new();
        for name in names {
            for table in self.all_tables() {
                if table.matches_name(name) && !found.iter().any(|t: &TableMetadata| t.name == table.name) {
                    found.push(table);
                }
            }
        }
        found
    }
}
