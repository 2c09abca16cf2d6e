//! Agent module - turn execution, memory, and the iterative runner
//!
//! Contains the agent that coordinates LLM calls, validation, and execution,
//! plus the runner that drives it through refinement loops.

pub mod memory;
pub mod orchestrator;
pub mod runner;
pub mod sql_agent;

pub use memory::{AgentMemory, DEFAULT_MAX_MESSAGES};
pub use orchestrator::{Orchestrator, SystemStatus};
pub use runner::{
    AgentRunner, IterationLog, RunOutcome, RunnerControl, RunnerState, RunnerStatus,
    DEFAULT_MAX_ITERATIONS,
};
pub use sql_agent::{AgentState, SqlAgent, TurnResult};
