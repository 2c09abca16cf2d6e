//! Agent loop integration tests
//!
//! Exercises the full system through the orchestrator: retrieval, SQL
//! generation, validation, execution against an embedded database, and the
//! runner's refinement and control behavior. The model is scripted so every
//! path is deterministic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map};

use queryforge::agent::{Orchestrator, RunnerControl, RunnerState};
use queryforge::core::{Config, QueryForgeError, Result, TableColumn, TableMetadata};
use queryforge::llm::LlmProvider;
use queryforge::retrieval::SchemaCatalog;
use queryforge::sql::{QueryExecutor, SqliteExecutor};

/// Scripted provider that records every prompt and can fire a one-shot hook
/// on a specific call, for driving runner control mid-run
struct ScriptedLlm {
    script: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    hook_at: usize,
    hook: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ScriptedLlm {
    fn new(script: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            hook_at: usize::MAX,
            hook: Mutex::new(None),
        })
    }

    fn with_hook(script: Vec<&str>, hook_at: usize, hook: Box<dyn FnOnce() + Send>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            hook_at,
            hook: Mutex::new(Some(hook)),
        })
    }

    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if call == self.hook_at {
            if let Some(hook) = self.hook.lock().unwrap().take() {
                hook();
            }
        }

        let next = self.script.lock().unwrap().pop_front();
        next.ok_or_else(|| QueryForgeError::llm("script exhausted"))
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

fn column(name: &str, data_type: &str, description: &str) -> TableColumn {
    TableColumn {
        name: name.to_string(),
        data_type: data_type.to_string(),
        description: description.to_string(),
        primary_key: false,
        nullable: true,
    }
}

fn catalog() -> Arc<SchemaCatalog> {
    Arc::new(SchemaCatalog::from_tables(vec![
        TableMetadata {
            schema: None,
            name: "customers".to_string(),
            description: "Customer master data".to_string(),
            columns: vec![
                column("id", "INTEGER", "Customer identifier"),
                column("name", "TEXT", "Customer name"),
            ],
        },
        TableMetadata {
            schema: None,
            name: "orders".to_string(),
            description: "Customer orders with totals".to_string(),
            columns: vec![
                column("id", "INTEGER", "Order identifier"),
                column("customer_id", "INTEGER", "Ordering customer"),
                column("total", "REAL", "Order total amount"),
            ],
        },
    ]))
}

async fn seeded_executor() -> Arc<SqliteExecutor> {
    let executor = SqliteExecutor::in_memory().unwrap();
    executor
        .execute_batch(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, total REAL);
             INSERT INTO customers (id, name) VALUES (1, 'Ada'), (2, 'Grace');
             INSERT INTO orders (id, customer_id, total) VALUES
                 (1, 1, 10.0), (2, 1, 32.5), (3, 2, 7.25);",
        )
        .await
        .unwrap();
    Arc::new(executor)
}

fn system(llm: Arc<ScriptedLlm>, executor: Option<Arc<dyn QueryExecutor>>) -> Orchestrator {
    Orchestrator::from_parts(Config::default(), llm, catalog(), executor).unwrap()
}

const GOOD_SQL: &str = "SELECT c.name, SUM(o.total) AS total_spent \
                        FROM customers c JOIN orders o ON o.customer_id = c.id \
                        GROUP BY c.name ORDER BY total_spent DESC;";

/// Happy path: retrieval, generation, validation, and execution in one turn
#[tokio::test]
async fn test_query_generates_and_executes_sql() {
    let llm = ScriptedLlm::new(vec![
        "Sum order totals per customer and rank them.",
        r#"{"tables": ["orders", "customers"]}"#,
        &format!(r#"{{"sql": "{}"}}"#, GOOD_SQL),
    ]);
    let executor = seeded_executor().await;
    let mut orch = system(llm, Some(executor));

    let outcome = orch
        .process_query_with("total spent by each customer", true, None)
        .await
        .unwrap();

    assert!(outcome.success);
    assert!(outcome.executed);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.sql.as_deref(), Some(GOOD_SQL));
    assert_eq!(outcome.thinking.as_deref(), Some("Sum order totals per customer and rank them."));

    let rows = outcome.rows.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], json!("Ada"));
    assert_eq!(rows[0]["total_spent"], json!(42.5));
    assert_eq!(rows[1]["name"], json!("Grace"));

    let status = orch.system_status();
    assert_eq!(status.memory.message_count, 2);
    assert_eq!(status.memory.execution_count, 3);
    assert_eq!(status.runner.state, RunnerState::Ready);
}

/// Invalid SQL fails validation, and the retry prompt carries a hint built
/// from that failure on top of the original query
#[tokio::test]
async fn test_validation_failure_retries_with_hint() {
    let llm = ScriptedLlm::new(vec![
        "analysis one",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT FROM customers;"}"#,
        "analysis two",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT name FROM customers;"}"#,
    ]);
    let mut orch = system(llm.clone(), None);

    let outcome = orch.process_query("list customer names").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.sql.as_deref(), Some("SELECT name FROM customers;"));
    assert_eq!(outcome.logs.len(), 2);
    assert_eq!(outcome.logs[0].status, "failed");
    assert_eq!(outcome.logs[1].status, "success");

    // Second iteration's first prompt sees the refined query
    let hinted = llm.prompt(3);
    assert!(hinted.contains("list customer names (Note: Previous attempt failed with:"));
    assert!(hinted.contains("SELECT clause lists no columns"));
    assert!(hinted.contains("Please adjust."));
}

/// Hints never compound: iteration three is still built on the original query
#[tokio::test]
async fn test_refinement_hints_do_not_compound() {
    let llm = ScriptedLlm::new(vec![
        "a1",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT FROM customers;"}"#,
        "a2",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT FROM customers;"}"#,
        "a3",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT name FROM customers;"}"#,
    ]);
    let mut orch = system(llm.clone(), None);

    let outcome = orch.process_query("list customer names").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.iterations, 3);

    let third = llm.prompt(6);
    assert_eq!(third.matches("Please adjust.").count(), 1);
    assert_eq!(third.matches("list customer names").count(), 1);
}

/// Execution failures consume an iteration and feed the database error into
/// the next attempt
#[tokio::test]
async fn test_execution_failure_consumes_iteration() {
    let llm = ScriptedLlm::new(vec![
        "a1",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT name FROM legacy_customers;"}"#,
        "a2",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT name FROM customers;"}"#,
    ]);
    let executor = seeded_executor().await;
    let mut orch = system(llm.clone(), Some(executor));

    let outcome = orch
        .process_query_with("list customer names", true, None)
        .await
        .unwrap();

    assert!(outcome.success);
    assert!(outcome.executed);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.rows.unwrap().len(), 2);

    assert_eq!(outcome.logs[0].status, "failed");
    let first_error = outcome.logs[0].error.as_deref().unwrap();
    assert!(first_error.contains("legacy_customers"));

    let hinted = llm.prompt(3);
    assert!(hinted.contains("legacy_customers"));
}

/// All iterations failing produces a failure envelope, not an error
#[tokio::test]
async fn test_exhaustion_reports_failure() {
    let llm = ScriptedLlm::new(vec![
        "a1",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT FROM customers;"}"#,
        "a2",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT FROM customers;"}"#,
        "a3",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT FROM customers;"}"#,
    ]);
    let mut orch = system(llm, None);

    let outcome = orch.process_query("list customer names").await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.iterations, 3);
    assert_eq!(outcome.logs.len(), 3);
    assert!(outcome.logs.iter().all(|log| log.status == "failed"));

    let error = outcome.error.unwrap();
    assert!(error.contains("after 3 attempts"));
    assert_eq!(orch.system_status().runner.state, RunnerState::Ready);
}

/// Style findings (missing semicolon, SELECT *) warn but never block
#[tokio::test]
async fn test_warnings_do_not_block_success() {
    let llm = ScriptedLlm::new(vec![
        "analysis",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT * FROM customers"}"#,
    ]);
    let mut orch = system(llm, None);

    let outcome = orch.process_query("show all customers").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.sql.as_deref(), Some("SELECT * FROM customers"));

    let validation = outcome.validation.unwrap();
    assert!(validation.syntax_valid);
    assert!(validation.issues.is_empty());
    assert_eq!(validation.warnings.len(), 2);
}

/// A stop request lands at the next iteration boundary and sticks until reset
#[tokio::test]
async fn test_stop_interrupts_loop_until_reset() {
    let slot: Arc<Mutex<Option<RunnerControl>>> = Arc::new(Mutex::new(None));
    let hook_slot = slot.clone();
    let llm = ScriptedLlm::with_hook(
        vec![
            "analysis",
            r#"{"tables": ["customers"]}"#,
            r#"{"sql": "SELECT FROM customers;"}"#,
        ],
        0,
        Box::new(move || {
            if let Some(control) = hook_slot.lock().unwrap().as_ref() {
                control.stop();
            }
        }),
    );
    let mut orch = system(llm, None);
    *slot.lock().unwrap() = Some(orch.control());

    let outcome = orch.process_query("list customer names").await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.logs.len(), 1);
    assert!(outcome.error.unwrap().contains("stopped"));
    assert_eq!(orch.system_status().runner.state, RunnerState::Stopped);

    // Still stopped: new queries are refused
    let err = orch.process_query("try again").await.unwrap_err();
    assert!(matches!(err, QueryForgeError::RunnerBusy(_)));

    orch.reset();
    let status = orch.system_status();
    assert_eq!(status.runner.state, RunnerState::Ready);
    assert_eq!(status.memory.message_count, 0);
}

/// Memory persists across queries; logs belong to the latest run only
#[tokio::test]
async fn test_memory_accumulates_across_queries() {
    let llm = ScriptedLlm::new(vec![
        "a1",
        r#"{"tables": ["customers"]}"#,
        r#"{"sql": "SELECT name FROM customers;"}"#,
        "a2",
        r#"{"tables": ["orders"]}"#,
        r#"{"sql": "SELECT total FROM orders;"}"#,
    ]);
    let mut orch = system(llm, None);

    let first = orch.process_query("list customer names").await.unwrap();
    assert!(first.success);

    let second = orch.process_query("list order totals").await.unwrap();
    assert!(second.success);
    assert_eq!(second.logs.len(), 1);

    let status = orch.system_status();
    assert_eq!(status.memory.message_count, 4);
    assert_eq!(status.memory.execution_count, 4);
}

/// Blank input is a contract violation, not a failed run
#[tokio::test]
async fn test_empty_query_is_rejected() {
    let llm = ScriptedLlm::new(vec![]);
    let mut orch = system(llm, None);

    let err = orch.process_query("   ").await.unwrap_err();
    assert!(matches!(err, QueryForgeError::EmptyQuery));
    assert_eq!(orch.system_status().runner.state, RunnerState::Ready);
}

/// Tools are callable directly, with failures kept inside the envelope
#[tokio::test]
async fn test_tool_dispatch_end_to_end() {
    let llm = ScriptedLlm::new(vec![
        r#"{"tables": ["orders"]}"#,
        r#"{"sql": "SELECT total FROM orders;"}"#,
    ]);
    let orch = system(llm, None);

    let mut params = Map::new();
    params.insert("query".to_string(), json!("order totals"));
    let outcome = orch.call_tool("generate_sql", params).await;

    assert!(outcome.success);
    assert_eq!(outcome.result.unwrap(), json!("SELECT total FROM orders;"));

    // Missing parameters never raise
    let outcome = orch.call_tool("generate_sql", Map::new()).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("query"));
}
