//! Agent runner
//!
//! Drives the agent through an iterative refinement loop. Failed iterations
//! feed a hint built from the latest error back into the next attempt; the
//! hint is always attached to the original query so refinements never
//! compound. Pause and stop requests are honored cooperatively at iteration
//! boundaries through a watch channel, so a control handle can live on any
//! task.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::agent::sql_agent::{AgentState, SqlAgent, TurnResult};
use crate::core::{MemorySummary, QueryForgeError, Result, Row};
use crate::sql::ValidationReport;

/// Iterations used when the caller does not override the limit
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

/// Runner lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerState {
    /// Accepting a new run
    Ready,
    /// A loop is in progress
    Running,
    /// Loop suspended until resumed or stopped
    Paused,
    /// Loop terminated early; reset before running again
    Stopped,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunnerState::Ready => "ready",
            RunnerState::Running => "running",
            RunnerState::Paused => "paused",
            RunnerState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// One iteration's log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationLog {
    /// 1-based iteration number
    pub iteration: usize,
    /// "success", "failed", or "error"
    pub status: String,
    /// SQL produced this iteration, when generation got that far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Validation report for that SQL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    /// Failure description for unsuccessful iterations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final result of a runner loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Whether any iteration succeeded
    pub success: bool,
    /// Generated SQL from the successful iteration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Validation report for that SQL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    /// Result rows when the SQL was executed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    /// Analysis from the successful iteration's thinking phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Whether the SQL actually ran against the database
    pub executed: bool,
    /// Why the run failed, when it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Iterations consumed
    pub iterations: usize,
    /// Agent state after the run
    pub agent_state: AgentState,
    /// Agent memory snapshot after the run
    pub memory: MemorySummary,
    /// Per-iteration log, also populated on failed runs
    pub logs: Vec<IterationLog>,
}

struct RunnerShared {
    state: watch::Sender<RunnerState>,
}

/// Cloneable handle for controlling a loop from other tasks
#[derive(Clone)]
pub struct RunnerControl {
    shared: Arc<RunnerShared>,
}

impl RunnerControl {
    /// Current runner state
    pub fn state(&self) -> RunnerState {
        *self.shared.state.borrow()
    }

    /// Suspend the loop at the next iteration boundary
    ///
    /// Only a running loop can be paused; otherwise this is a no-op.
    pub fn pause(&self) {
        let paused = self.shared.state.send_if_modified(|state| {
            if *state == RunnerState::Running {
                *state = RunnerState::Paused;
                true
            } else {
                false
            }
        });
        if paused {
            info!("runner pause requested");
        }
    }

    /// Resume a paused loop
    ///
    /// Resuming a ready or running loop is a no-op; a stopped runner must be
    /// reset instead.
    pub fn resume(&self) -> Result<()> {
        let mut stopped = false;
        let resumed = self.shared.state.send_if_modified(|state| match *state {
            RunnerState::Paused => {
                *state = RunnerState::Running;
                true
            }
            RunnerState::Stopped => {
                stopped = true;
                false
            }
            _ => false,
        });

        if stopped {
            return Err(QueryForgeError::RunnerStopped);
        }
        if resumed {
            info!("runner resumed");
        }
        Ok(())
    }

    /// Terminate the loop at the next iteration boundary
    ///
    /// Also wakes a paused loop. The runner stays stopped until reset.
    pub fn stop(&self) {
        self.shared.state.send_replace(RunnerState::Stopped);
        info!("runner stop requested");
    }
}

/// Point-in-time runner status
#[derive(Debug, Clone, Serialize)]
pub struct RunnerStatus {
    pub state: RunnerState,
    pub current_iteration: usize,
    pub max_iterations: usize,
    pub agent_state: AgentState,
}

/// Runs the agent in an iterative refinement loop
pub struct AgentRunner {
    agent: SqlAgent,
    shared: Arc<RunnerShared>,
    max_iterations: usize,
    current_iteration: usize,
    logs: Vec<IterationLog>,
}

impl AgentRunner {
    /// Create a runner with the default iteration limit
    pub fn new(agent: SqlAgent) -> Self {
        Self::with_max_iterations(agent, DEFAULT_MAX_ITERATIONS)
    }

    /// Create a runner with a specific iteration limit
    pub fn with_max_iterations(agent: SqlAgent, max_iterations: usize) -> Self {
        let (state, _) = watch::channel(RunnerState::Ready);
        Self {
            agent,
            shared: Arc::new(RunnerShared { state }),
            max_iterations,
            current_iteration: 0,
            logs: Vec::new(),
        }
    }

    /// Handle for pausing, resuming, or stopping from another task
    pub fn control(&self) -> RunnerControl {
        RunnerControl {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current runner state
    pub fn state(&self) -> RunnerState {
        *self.shared.state.borrow()
    }

    /// Runner and agent status snapshot
    pub fn status(&self) -> RunnerStatus {
        RunnerStatus {
            state: self.state(),
            current_iteration: self.current_iteration,
            max_iterations: self.max_iterations,
            agent_state: self.agent.state(),
        }
    }

    /// Change the iteration limit used when `run` gets no override
    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.max_iterations = max_iterations.max(1);
    }

    /// Log entries from the most recent run
    pub fn logs(&self) -> &[IterationLog] {
        &self.logs
    }

    /// Read access to the wrapped agent
    pub fn agent(&self) -> &SqlAgent {
        &self.agent
    }

    /// Mutable access to the wrapped agent
    pub fn agent_mut(&mut self) -> &mut SqlAgent {
        &mut self.agent
    }

    /// Run the agent loop for a query
    ///
    /// Returns after the first successful iteration, after the iteration
    /// budget is exhausted, or once a stop request is honored. The runner
    /// must be ready: concurrent runs and runs after a stop are rejected.
    pub async fn run(
        &mut self,
        user_query: &str,
        execute: bool,
        max_iterations: Option<usize>,
    ) -> Result<RunOutcome> {
        let query = user_query.trim().to_string();
        if query.is_empty() {
            return Err(QueryForgeError::EmptyQuery);
        }

        if let Some(limit) = max_iterations {
            if limit == 0 {
                return Err(QueryForgeError::InvalidIterations);
            }
            self.max_iterations = limit;
        }

        let mut started = false;
        self.shared.state.send_if_modified(|state| {
            if *state == RunnerState::Ready {
                *state = RunnerState::Running;
                started = true;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(QueryForgeError::RunnerBusy(self.state().to_string()));
        }

        self.current_iteration = 0;
        self.logs.clear();

        info!(query = %query, max_iterations = self.max_iterations, "starting agent loop");

        let mut rx = self.shared.state.subscribe();
        let mut current_query = query.clone();
        let mut last_failure: Option<String> = None;
        let mut stopped = false;

        for iteration in 1..=self.max_iterations {
            // Honor pause/stop requests between iterations
            loop {
                let state = *rx.borrow_and_update();
                match state {
                    RunnerState::Stopped => {
                        stopped = true;
                        break;
                    }
                    RunnerState::Paused => {
                        info!("runner paused");
                        if rx.changed().await.is_err() {
                            stopped = true;
                            break;
                        }
                    }
                    _ => break,
                }
            }
            if stopped {
                break;
            }

            self.current_iteration = iteration;
            info!(iteration, max = self.max_iterations, "iteration start");

            match self.agent.execute(&current_query, execute).await {
                Ok(result) => {
                    self.logs.push(IterationLog {
                        iteration,
                        status: if result.success { "success" } else { "failed" }.to_string(),
                        sql: result.sql.clone(),
                        validation: result.validation.clone(),
                        error: result.error.clone(),
                    });

                    if result.success {
                        self.finish();
                        return Ok(self.success_outcome(result, iteration));
                    }

                    last_failure = result.error.clone();
                    if iteration < self.max_iterations {
                        info!(iteration, "iteration had issues, refining query");
                        current_query = refine_query(&query, result.error.as_deref());
                    }
                }
                Err(e) => {
                    warn!(iteration, error = %e, "iteration errored");
                    let error = e.to_string();
                    self.logs.push(IterationLog {
                        iteration,
                        status: "error".to_string(),
                        sql: None,
                        validation: None,
                        error: Some(error.clone()),
                    });
                    last_failure = Some(error.clone());
                    if iteration < self.max_iterations {
                        current_query = refine_query(&query, Some(&error));
                    }
                }
            }
        }

        if stopped {
            info!(completed = self.logs.len(), "runner stopped before completion");
            return Ok(self.failure_outcome("Run stopped before completion".to_string()));
        }

        self.finish();

        let mut error = format!(
            "Could not generate valid SQL after {} attempts",
            self.max_iterations
        );
        if let Some(last) = last_failure {
            error.push_str(&format!("; last error: {}", last));
        }
        Ok(self.failure_outcome(error))
    }

    /// Clear loop state and make the runner ready again
    ///
    /// This is the only way out of the stopped state. Also resets the agent,
    /// dropping its memory.
    pub fn reset(&mut self) {
        self.agent.reset();
        self.logs.clear();
        self.current_iteration = 0;
        self.shared.state.send_replace(RunnerState::Ready);
        info!("runner reset");
    }

    // Return to ready unless a stop arrived during the final iteration
    fn finish(&self) {
        self.shared.state.send_if_modified(|state| match *state {
            RunnerState::Running | RunnerState::Paused => {
                *state = RunnerState::Ready;
                true
            }
            _ => false,
        });
    }

    fn success_outcome(&self, result: TurnResult, iterations: usize) -> RunOutcome {
        RunOutcome {
            success: result.success,
            sql: result.sql,
            validation: result.validation,
            rows: result.rows,
            thinking: result.thinking,
            executed: result.executed,
            error: result.error,
            iterations,
            agent_state: self.agent.state(),
            memory: self.agent.memory_summary(),
            logs: self.logs.clone(),
        }
    }

    fn failure_outcome(&self, error: String) -> RunOutcome {
        RunOutcome {
            success: false,
            sql: None,
            validation: None,
            rows: None,
            thinking: None,
            executed: false,
            error: Some(error),
            iterations: self.logs.len(),
            agent_state: self.agent.state(),
            memory: self.agent.memory_summary(),
            logs: self.logs.clone(),
        }
    }
}

/// Build the next attempt's query from the original and the latest failure
fn refine_query(original: &str, error: Option<&str>) -> String {
    let reason = error.unwrap_or("unknown error");
    format!(
        "{} (Note: Previous attempt failed with: {}. Please adjust.)",
        original, reason
    )
}
