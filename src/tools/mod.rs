//! Tools module - tool implementations for the agent
//!
//! Contains the registry and the built-in SQL tool set.

pub mod builtin;
pub mod registry;

pub use builtin::register_builtin_tools;
pub use registry::{Tool, ToolHandler, ToolOutcome, ToolRegistry};
