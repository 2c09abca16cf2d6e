//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use serde_json::{Map, Value};

use crate::agent::Orchestrator;
use crate::core::Result;

/// Result of parsing a command
pub enum CommandResult {
    /// Continue processing as a natural-language query
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Agent was reset
    Clear,
}

/// Parse and handle special commands
pub async fn handle_command(input: &str, orch: &mut Orchestrator) -> Result<CommandResult> {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "clear" | "reset" => {
            orch.reset();
            Ok(CommandResult::Clear)
        }

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "status" => Ok(CommandResult::Handled(status_text(orch))),

        "tools" => Ok(CommandResult::Handled(tools_text(orch))),

        "tool" => handle_tool_command(args, orch).await,

        "explain" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled(
                    "Usage: explain <sql>".to_string(),
                ));
            }
            let explanation = orch.explain(args).await?;
            Ok(CommandResult::Handled(explanation))
        }

        "tables" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled(
                    "Usage: tables <request text>".to_string(),
                ));
            }
            let tables = orch.related_tables(args).await?;
            if tables.is_empty() {
                return Ok(CommandResult::Handled("No matching tables found.".to_string()));
            }
            let listing = tables
                .iter()
                .map(|t| {
                    format!(
                        "  {} ({} columns)\n    {}",
                        t.qualified_name(),
                        t.columns.len(),
                        t.description
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Ok(CommandResult::Handled(format!("Relevant tables:\n{}", listing)))
        }

        "execute" => {
            match args.to_lowercase().as_str() {
                "" => Ok(CommandResult::Handled(format!(
                    "Execution is {}",
                    if orch.execute_enabled() { "on" } else { "off" }
                ))),
                "on" | "true" | "1" | "yes" => {
                    orch.set_execute(true);
                    Ok(CommandResult::Handled("Execution: ON".to_string()))
                }
                "off" | "false" | "0" | "no" => {
                    orch.set_execute(false);
                    Ok(CommandResult::Handled("Execution: OFF".to_string()))
                }
                _ => Ok(CommandResult::Handled(
                    "Usage: execute [on|off]".to_string(),
                )),
            }
        }

        "iterations" => match args.parse::<usize>() {
            Ok(n) if n >= 1 => {
                orch.set_max_iterations(n);
                Ok(CommandResult::Handled(format!(
                    "Iteration limit set to {}",
                    n
                )))
            }
            _ => Ok(CommandResult::Handled(
                "Usage: iterations <n>  (n must be at least 1)".to_string(),
            )),
        },

        _ => {
            // Not a command, treat as a query
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// Handle direct tool invocation: `tool <name> [json params]`
async fn handle_tool_command(args: &str, orch: &mut Orchestrator) -> Result<CommandResult> {
    let parts: Vec<&str> = args.splitn(2, ' ').collect();

    if parts.is_empty() || parts[0].is_empty() {
        return Ok(CommandResult::Handled(
            "Usage: tool <name> [json params]\n\
             Examples:\n\
               tool validate_sql {\"sql\": \"SELECT * FROM orders;\"}\n\
               tool get_metadata {\"query_text\": \"customer revenue\"}"
                .to_string(),
        ));
    }

    let name = parts[0];
    let raw = parts.get(1).map(|s| s.trim()).unwrap_or("{}");

    let params: Map<String, Value> = match serde_json::from_str(raw) {
        Ok(params) => params,
        Err(e) => {
            return Ok(CommandResult::Handled(format!(
                "Invalid tool parameters (expected a JSON object): {}",
                e
            )));
        }
    };

    let outcome = orch.call_tool(name, params).await;
    let rendered = serde_json::to_string_pretty(&outcome)
        .unwrap_or_else(|_| format!("success: {}", outcome.success));
    Ok(CommandResult::Handled(rendered))
}

/// Format the system status
fn status_text(orch: &Orchestrator) -> String {
    let status = orch.system_status();

    format!(
        "QueryForge Status:\n\
         ─────────────────────────────\n\
         Provider:   {} ({})\n\
         Database:   {}\n\
         Execute:    {}\n\
         Runner:     {} (iteration {}/{})\n\
         Agent:      {}\n\
         Memory:     {} messages, {} executions\n\
         Tools:      {}",
        status.provider,
        status.model,
        status.database.as_deref().unwrap_or("none"),
        if status.execute { "on" } else { "off" },
        status.runner.state,
        status.runner.current_iteration,
        status.runner.max_iterations,
        status.runner.agent_state,
        status.memory.message_count,
        status.memory.execution_count,
        status.tools.join(", ")
    )
}

/// Format the registered tool listing
fn tools_text(orch: &Orchestrator) -> String {
    let mut output = String::from("Registered tools:\n");
    for descriptor in orch.tool_descriptors() {
        let name = descriptor["name"].as_str().unwrap_or("?");
        let description = descriptor["description"].as_str().unwrap_or("");
        output.push_str(&format!("  {}\n    {}\n", name, description));
    }
    output.push_str("\nInvoke directly with: tool <name> <json params>");
    output
}

/// Generate help text
fn help_text() -> String {
    r#"QueryForge Commands:
─────────────────────────────────────────────
  help, ?            Show this help message
  exit, quit, q      Exit QueryForge
  clear, reset       Reset the agent (memory, runner state)
  status             Show system status
  tools              List registered tools
  tool <name> <json> Invoke a tool directly
  explain <sql>      Explain a SQL statement in plain language
  tables <text>      Show catalog tables relevant to a request
  execute [on|off]   Show or set whether generated SQL runs
  iterations <n>     Set the refinement iteration limit

Anything else is treated as a natural-language query.

Keyboard Shortcuts:
  Ctrl+C             Cancel current operation
  Ctrl+D             Exit QueryForge
─────────────────────────────────────────────"#
        .to_string()
}
