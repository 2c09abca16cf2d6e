//! Agent memory
//!
//! A bounded conversation window plus an unbounded execution history. The
//! window drops the oldest message first once it is full; execution records
//! are kept for the life of the memory so refinement and status reporting
//! can see the whole trail.

use std::collections::VecDeque;

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::{ExecutionRecord, MemorySummary, Message};

/// Conversation window size used when none is configured
pub const DEFAULT_MAX_MESSAGES: usize = 50;

/// Conversation and execution memory for one agent
#[derive(Debug, Clone)]
pub struct AgentMemory {
    messages: VecDeque<Message>,
    max_messages: usize,
    context: Map<String, Value>,
    executions: Vec<ExecutionRecord>,
}

impl AgentMemory {
    /// Create a memory with the default window size
    pub fn new() -> Self {
        Self::with_window(DEFAULT_MAX_MESSAGES)
    }

    /// Create a memory retaining at most `max_messages` conversation messages
    pub fn with_window(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages,
            context: Map::new(),
            executions: Vec::new(),
        }
    }

    /// Append a message, evicting the oldest once the window is full
    pub fn add_message(&mut self, message: Message) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// Retained conversation messages, oldest first
    pub fn messages(&self) -> &VecDeque<Message> {
        &self.messages
    }

    /// Record a tool execution
    pub fn add_execution(&mut self, record: ExecutionRecord) {
        debug!(tool = %record.tool, success = record.success, "execution recorded");
        self.executions.push(record);
    }

    /// All recorded executions, oldest first
    pub fn executions(&self) -> &[ExecutionRecord] {
        &self.executions
    }

    /// Most recent execution, if any
    pub fn last_execution(&self) -> Option<&ExecutionRecord> {
        self.executions.last()
    }

    /// Set a free-form context entry
    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.context.insert(key.into(), value);
    }

    /// Free-form context entries
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Snapshot for status reporting; does not mutate the memory
    pub fn summary(&self) -> MemorySummary {
        MemorySummary {
            message_count: self.messages.len(),
            execution_count: self.executions.len(),
            context: self.context.clone(),
            last_execution: self.executions.last().cloned(),
        }
    }

    /// Drop all messages, context, and execution history
    pub fn clear(&mut self) {
        self.messages.clear();
        self.context.clear();
        self.executions.clear();
    }
}

impl Default for AgentMemory {
    fn default() -> Self {
        Self::new()
    }
}
