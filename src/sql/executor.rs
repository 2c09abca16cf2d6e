//! Query execution backends
//!
//! The embedded SQLite executor guards its connection with an async mutex so
//! the agent can run queries from async context without blocking other tasks
//! on connection access.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::{Result, Row};

/// Backend capable of running SQL and returning rows
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a statement and return its result rows
    ///
    /// Statements that produce no rows (DDL, inserts) return an empty vec.
    async fn run(&self, sql: &str) -> Result<Vec<Row>>;

    /// Backend name for logging and status display
    fn backend(&self) -> &str;
}

/// Executor over an embedded SQLite database
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Open a database file, creating it when absent
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened sqlite database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a fresh in-memory database
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    /// Run several statements at once, for schema setup
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn run(&self, sql: &str) -> Result<Vec<Row>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, name) in names.iter().enumerate() {
                record.insert(name.clone(), json_value(row.get_ref(i)?));
            }
            out.push(record);
        }

        debug!(rows = out.len(), "query executed");
        Ok(out)
    }

    fn backend(&self) -> &str {
        "sqlite"
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} byte blob>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> SqliteExecutor {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor
            .execute_batch(
                "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT, balance REAL);
                 INSERT INTO customers VALUES (1, 'Alice', 120.5);
                 INSERT INTO customers VALUES (2, 'Bob', NULL);",
            )
            .await
            .unwrap();
        executor
    }

    #[tokio::test]
    async fn test_select_rows() {
        let executor = seeded().await;
        let rows = executor
            .run("SELECT id, name, balance FROM customers ORDER BY id")
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], Value::from(1));
        assert_eq!(rows[0]["name"], Value::from("Alice"));
        assert_eq!(rows[1]["balance"], Value::Null);
    }

    #[tokio::test]
    async fn test_missing_table_errors() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let err = executor.run("SELECT * FROM nope").await.unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_statement_without_rows() {
        let executor = seeded().await;
        let rows = executor
            .run("UPDATE customers SET balance = 0 WHERE id = 2")
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
