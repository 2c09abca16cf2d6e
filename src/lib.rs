//! QueryForge - Natural Language to SQL Agent
//!
//! A retrieval-augmented agent that turns business questions into SQL:
//! it finds the relevant tables in a schema catalog, asks a language model
//! to generate a query, validates the result, and optionally runs it
//! against a database, retrying with feedback when an attempt fails.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction with Ollama and OpenAI-compatible backends
//! - **Retrieval**: Schema catalog and table search
//! - **Pipeline**: Prompt construction and SQL/JSON extraction from model output
//! - **SQL**: Statement validation and query execution
//! - **Tools**: Registry of callable tools over the pipeline
//! - **Agent**: Turn execution, memory, and the iterative runner
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use queryforge::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> queryforge::Result<()> {
//!     let mut orchestrator = Orchestrator::from_config(Config::load())?;
//!     orchestrator.initialize().await?;
//!
//!     let outcome = orchestrator.process_query("total revenue per customer").await?;
//!     println!("{:?}", outcome.sql);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
pub mod sql;
pub mod tools;

// Re-export commonly used items
pub use agent::{Orchestrator, RunOutcome, SqlAgent};
pub use cli::Repl;
pub use core::{Config, QueryForgeError, Result};
