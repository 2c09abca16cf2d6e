//! Interactive REPL for QueryForge
//!
//! Provides the main user interaction loop.

use std::io::{self, BufRead, Write};

use crate::agent::{Orchestrator, RunOutcome};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, Result};

/// Rows shown before the output is truncated
const MAX_DISPLAY_ROWS: usize = 20;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    orchestrator: Orchestrator,
}

impl Repl {
    /// Create a new REPL with default configuration
    pub fn new() -> Result<Self> {
        Ok(Self {
            orchestrator: Orchestrator::new()?,
        })
    }

    /// Create a REPL with custom configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            orchestrator: Orchestrator::from_config(config)?,
        })
    }

    /// Create a REPL around an already-assembled system
    pub fn with_orchestrator(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        print!("Checking provider...");
        io::stdout().flush()?;

        match self.orchestrator.initialize().await {
            Ok(()) => println!(" ready.\n"),
            Err(e) => {
                println!("\n\nInitialization error: {}\n", e);
                return Ok(());
            }
        }

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("query> ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();

            if input.is_empty() {
                continue;
            }

            match handle_command(input, &mut self.orchestrator).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Clear) => {
                    println!("Agent reset.\n");
                    continue;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                    continue;
                }
                Ok(CommandResult::Continue(query)) => {
                    match self.orchestrator.process_query(&query).await {
                        Ok(outcome) => println!("{}", format_outcome(&outcome)),
                        Err(e) => eprintln!("\nError: {}\n", e),
                    }
                }
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let status = self.orchestrator.system_status();

        println!(
            r#"
╔═══════════════════════════════════════════════════╗
║                                                   ║
║   QueryForge - Natural Language to SQL Agent      ║
║                                                   ║
╚═══════════════════════════════════════════════════╝"#
        );
        println!("Provider:   {} ({})", status.provider, status.model);
        println!(
            "Database:   {}",
            status.database.as_deref().unwrap_or("none (generation only)")
        );
        println!(
            "Execute:    {}",
            if status.execute { "on" } else { "off" }
        );
        println!();
        println!("Commands: help, status, tools, execute, reset, exit");
        println!("─────────────────────────────────────────────────────");
    }
}

/// Render a run outcome for the terminal
pub fn format_outcome(outcome: &RunOutcome) -> String {
    let mut out = String::new();

    if outcome.success {
        if let Some(thinking) = &outcome.thinking {
            out.push_str("\nAnalysis:\n");
            for line in thinking.lines() {
                out.push_str(&format!("  {}\n", line));
            }
        }

        if let Some(sql) = &outcome.sql {
            out.push_str("\nSQL:\n");
            out.push_str(&format!("  {}\n", sql));
        }

        if let Some(validation) = &outcome.validation {
            for warning in &validation.warnings {
                out.push_str(&format!("  warning: {}\n", warning));
            }
        }

        if let Some(rows) = &outcome.rows {
            out.push_str(&format!("\nRows ({}):\n", rows.len()));
            for row in rows.iter().take(MAX_DISPLAY_ROWS) {
                let rendered = serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string());
                out.push_str(&format!("  {}\n", rendered));
            }
            if rows.len() > MAX_DISPLAY_ROWS {
                out.push_str(&format!("  ... {} more\n", rows.len() - MAX_DISPLAY_ROWS));
            }
        } else if !outcome.executed {
            out.push_str("\n(not executed; use 'execute on' to run queries)\n");
        }
    } else {
        let reason = outcome.error.as_deref().unwrap_or("unknown error");
        out.push_str(&format!("\nFailed: {}\n", reason));
        for log in &outcome.logs {
            let detail = log.error.as_deref().unwrap_or(&log.status);
            out.push_str(&format!("  iteration {}: {}\n", log.iteration, detail));
        }
    }

    out.push_str(&format!(
        "\n[{} iteration{}]\n",
        outcome.iterations,
        if outcome.iterations == 1 { "" } else { "s" }
    ));
    out
}
