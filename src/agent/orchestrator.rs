//! Agent orchestrator
//!
//! Facade that wires configuration into a ready-to-use agent system:
//! language model provider, schema catalog, SQL pipeline, database executor,
//! tool registry, and the iterative runner.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::agent::runner::{AgentRunner, RunOutcome, RunnerControl, RunnerStatus};
use crate::agent::sql_agent::SqlAgent;
use crate::core::{Config, MemorySummary, QueryForgeError, Result, TableMetadata};
use crate::llm::{create_provider, LlmProvider};
use crate::pipeline::SqlPipeline;
use crate::retrieval::{SchemaCatalog, SchemaIndex};
use crate::sql::{QueryExecutor, SqliteExecutor};
use crate::tools::{register_builtin_tools, ToolOutcome, ToolRegistry};

/// System-wide status snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    /// Runner and agent state
    pub runner: RunnerStatus,
    /// Agent memory snapshot
    pub memory: MemorySummary,
    /// Registered tool names
    pub tools: Vec<String>,
    /// Provider label (ollama, openai, vllm)
    pub provider: String,
    /// Model the provider is configured for
    pub model: String,
    /// Database backend name, when one is attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Whether generated SQL is run against the database
    pub execute: bool,
}

/// Complete agent system assembled from configuration
pub struct Orchestrator {
    config: Config,
    llm: Arc<dyn LlmProvider>,
    runner: AgentRunner,
    tools: ToolRegistry,
    database: Option<String>,
    execute: bool,
}

impl Orchestrator {
    /// Assemble the system from the default configuration
    pub fn new() -> Result<Self> {
        Self::from_config(Config::load())
    }

    /// Assemble the system from a configuration
    ///
    /// Loads the schema catalog and opens the database named in the config.
    /// A missing catalog path leaves retrieval empty; a missing database
    /// path leaves execution disabled.
    pub fn from_config(config: Config) -> Result<Self> {
        let llm = create_provider(&config);

        let catalog = match &config.retrieval.catalog_path {
            Some(path) => {
                let catalog = SchemaCatalog::from_file(path)?;
                info!(
                    path = %path.display(),
                    tables = catalog.len(),
                    "loaded schema catalog"
                );
                catalog
            }
            None => {
                warn!("no schema catalog configured; table retrieval will find nothing");
                SchemaCatalog::default()
            }
        };

        let executor: Option<Arc<dyn QueryExecutor>> = match &config.database.path {
            Some(path) => {
                let executor = SqliteExecutor::open(path)?;
                info!(path = %path.display(), "attached sqlite database");
                Some(Arc::new(executor))
            }
            None => None,
        };

        Self::from_parts(config, llm, Arc::new(catalog), executor)
    }

    /// Assemble the system from already-built components
    ///
    /// Entry point for embedding: callers supply their own provider, schema
    /// index, and executor instead of having them built from the config.
    pub fn from_parts(
        config: Config,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn SchemaIndex>,
        executor: Option<Arc<dyn QueryExecutor>>,
    ) -> Result<Self> {
        let pipeline = Arc::new(SqlPipeline::new(
            Arc::clone(&llm),
            index,
            config.database.dialect.clone(),
            config.retrieval.top_k,
        ));

        let agent = SqlAgent::with_memory_window(
            Arc::clone(&llm),
            Arc::clone(&pipeline),
            executor.clone(),
            config.agent.max_messages,
        );
        let runner = AgentRunner::with_max_iterations(agent, config.agent.max_iterations);

        let mut tools = ToolRegistry::default();
        register_builtin_tools(&mut tools, pipeline, executor.clone(), Arc::clone(&llm))?;

        let database = executor.map(|e| e.backend().to_string());
        let execute = config.agent.execute_by_default;

        Ok(Self {
            config,
            llm,
            runner,
            tools,
            database,
            execute,
        })
    }

    /// Check that the configured model is reachable and available
    pub async fn initialize(&self) -> Result<()> {
        if !self.llm.is_available().await? {
            return Err(QueryForgeError::llm(format!(
                "Model '{}' is not available from provider '{}'",
                self.llm.model(),
                self.llm.name()
            )));
        }
        info!(
            provider = self.llm.name(),
            model = self.llm.model(),
            "provider ready"
        );
        Ok(())
    }

    /// Run the agent loop for a natural-language query
    ///
    /// Uses the orchestrator's execute setting and the runner's iteration
    /// limit.
    pub async fn process_query(&mut self, query: &str) -> Result<RunOutcome> {
        let execute = self.execute;
        self.runner.run(query, execute, None).await
    }

    /// Run the agent loop with explicit execute and iteration overrides
    pub async fn process_query_with(
        &mut self,
        query: &str,
        execute: bool,
        max_iterations: Option<usize>,
    ) -> Result<RunOutcome> {
        self.runner.run(query, execute, max_iterations).await
    }

    /// Invoke a registered tool by name
    ///
    /// Failures come back inside the outcome envelope, never as an error.
    pub async fn call_tool(&self, name: &str, params: Map<String, Value>) -> ToolOutcome {
        self.tools.dispatch(name, params).await
    }

    /// Explain what a SQL statement does, in plain language
    pub async fn explain(&mut self, sql: &str) -> Result<String> {
        self.runner.agent_mut().explain_query(sql).await
    }

    /// Find the catalog tables relevant to a request
    pub async fn related_tables(&mut self, query_text: &str) -> Result<Vec<TableMetadata>> {
        self.runner.agent_mut().table_metadata(query_text).await
    }

    /// Snapshot of runner, agent, and tool state
    pub fn system_status(&self) -> SystemStatus {
        SystemStatus {
            runner: self.runner.status(),
            memory: self.runner.agent().memory_summary(),
            tools: self.tools.names(),
            provider: self.llm.name().to_string(),
            model: self.llm.model().to_string(),
            database: self.database.clone(),
            execute: self.execute,
        }
    }

    /// Handle for pausing, resuming, or stopping a run from another task
    pub fn control(&self) -> RunnerControl {
        self.runner.control()
    }

    /// Reset the runner and the agent, dropping memory and logs
    pub fn reset(&mut self) {
        self.runner.reset();
    }

    /// Whether generated SQL is run against the database
    pub fn execute_enabled(&self) -> bool {
        self.execute
    }

    /// Enable or disable running generated SQL
    pub fn set_execute(&mut self, execute: bool) {
        self.execute = execute;
    }

    /// Change the runner's iteration limit
    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.runner.set_max_iterations(max_iterations);
    }

    /// Tool descriptors for every registered tool
    pub fn tool_descriptors(&self) -> Vec<Value> {
        self.tools.list()
    }

    /// Read access to the runner
    pub fn runner(&self) -> &AgentRunner {
        &self.runner
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable configuration access
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}
