//! QueryForge - Natural Language to SQL Agent
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;

use clap::Parser;
use queryforge::cli::repl::format_outcome;
use queryforge::core::ProviderKind;
use queryforge::{Config, Orchestrator, Repl};
use tracing_subscriber::EnvFilter;

/// QueryForge - Natural Language to SQL Agent
#[derive(Parser, Debug)]
#[command(name = "queryforge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use for generation
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// LLM provider backend (ollama, openai, vllm)
    #[arg(long)]
    provider: Option<String>,

    /// SQLite database to run generated queries against
    #[arg(long)]
    database: Option<PathBuf>,

    /// Schema catalog file (JSON)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Run generated SQL instead of only printing it
    #[arg(long, short = 'x')]
    execute: bool,

    /// Refinement iteration limit
    #[arg(long, short = 'i')]
    iterations: Option<usize>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single query mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.debug);

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.llm.model = model.clone();
    }

    if let Some(ref provider) = args.provider {
        config.provider = ProviderKind::parse(provider)?;
    }

    if let Some(ref database) = args.database {
        config.database.path = Some(database.clone());
    }

    if let Some(ref catalog) = args.catalog {
        config.retrieval.catalog_path = Some(catalog.clone());
    }

    if args.execute {
        config.agent.execute_by_default = true;
    }

    if let Some(iterations) = args.iterations {
        if iterations == 0 {
            anyhow::bail!("--iterations must be at least 1");
        }
        config.agent.max_iterations = iterations;
    }

    if args.debug {
        config.agent.debug = true;
    }

    // Single query mode
    if let Some(prompt) = args.prompt {
        let mut orchestrator = Orchestrator::from_config(config)?;
        orchestrator.initialize().await?;

        let outcome = orchestrator.process_query(&prompt).await?;
        println!("{}", format_outcome(&outcome));
        if !outcome.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    // Interactive REPL mode
    let mut repl = Repl::with_config(config)?;
    repl.run().await?;

    Ok(())
}

/// Initialize the tracing subscriber
///
/// `RUST_LOG` takes precedence; otherwise `--debug` raises the crate's level.
fn init_tracing(debug: bool) {
    let fallback = if debug { "queryforge=debug" } else { "queryforge=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
