//! Tool registry - manages and dispatches tool calls
//!
//! Central hub for registering tools and routing calls by name to their
//! async handlers. Dispatch never fails at the call site: every problem,
//! from an unknown name to a handler error, comes back inside the outcome
//! envelope so callers have one uniform path.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::core::{QueryForgeError, Result};

/// Async handler backing a tool
pub type ToolHandler = Arc<
    dyn Fn(Map<String, Value>) -> BoxFuture<'static, std::result::Result<Value, String>>
        + Send
        + Sync,
>;

/// A named tool with its schema and handler
#[derive(Clone)]
pub struct Tool {
    /// Unique tool name
    pub name: String,
    /// What the tool does, for listings and prompts
    pub description: String,
    /// JSON schema describing the accepted parameters
    pub input_schema: Value,
    /// Parameters that must be present for dispatch to proceed
    pub required_params: Vec<String>,
    handler: ToolHandler,
}

impl Tool {
    /// Create a tool from its parts
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        required_params: Vec<&str>,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            required_params: required_params.into_iter().map(String::from).collect(),
            handler,
        }
    }

    /// Descriptor for API responses and tool listings
    pub fn descriptor(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema,
        })
    }
}

/// Result envelope for a dispatched tool call
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolOutcome {
    /// Whether the call produced a result
    pub success: bool,
    /// Handler output on success
    pub result: Option<Value>,
    /// What went wrong on failure
    pub error: Option<String>,
}

impl ToolOutcome {
    /// Successful outcome carrying the handler's output
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Failed outcome carrying the error description
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    /// Tools indexed by name
    tools: HashMap<String, Tool>,
    /// Names in registration order, for stable listings
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    ///
    /// Names are unique: registering under a taken name is rejected and the
    /// existing tool keeps working. Replace a tool by unregistering first.
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        if self.tools.contains_key(&tool.name) {
            return Err(QueryForgeError::DuplicateTool(tool.name));
        }
        info!(tool = %tool.name, "tool registered");
        self.order.push(tool.name.clone());
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Remove a tool, returning whether it was present
    pub fn unregister(&mut self, name: &str) -> bool {
        if self.tools.remove(name).is_some() {
            self.order.retain(|n| n != name);
            info!(tool = name, "tool unregistered");
            true
        } else {
            false
        }
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Check whether a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool descriptors in registration order
    pub fn list(&self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(Tool::descriptor)
            .collect()
    }

    /// Registered tool names in registration order
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a call to the named tool
    ///
    /// Unknown names, missing required parameters, and handler errors all
    /// come back as failure outcomes rather than `Err`.
    pub async fn dispatch(&self, name: &str, params: Map<String, Value>) -> ToolOutcome {
        let tool = match self.tools.get(name) {
            Some(tool) => tool,
            None => {
                return ToolOutcome::failure(
                    QueryForgeError::ToolNotFound(name.to_string()).to_string(),
                )
            }
        };

        let missing: Vec<String> = tool
            .required_params
            .iter()
            .filter(|p| !params.contains_key(p.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return ToolOutcome::failure(
                QueryForgeError::MissingParameters {
                    tool: name.to_string(),
                    missing,
                }
                .to_string(),
            );
        }

        info!(tool = name, "executing tool");
        match (tool.handler)(params).await {
            Ok(result) => {
                info!(tool = name, "tool executed successfully");
                ToolOutcome::success(result)
            }
            Err(e) => {
                error!(tool = name, error = %e, "tool execution failed");
                ToolOutcome::failure(e)
            }
        }
    }
}
