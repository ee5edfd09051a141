use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "goblin", about = "LLM-assisted single-stock analysis")]
struct Cli {
    /// Ticker symbol to analyze
    symbol: String,

    /// Analysis date (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    date: Option<String>,

    /// Session identifier; defaults to analysis_<uuid>
    #[arg(long)]
    session_id: Option<String>,

    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the outcome as JSON instead of a text report
    #[arg(long)]
    json: bool,

    /// Pretty-print the JSON output
    #[arg(long, requires = "json")]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Respects RUST_LOG, e.g. RUST_LOG=goblin_agents=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = goblin::load_config(cli.config.as_deref())?;
    let date = cli
        .date
        .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());
    let session_id = cli.session_id.unwrap_or_else(goblin::new_session_id);

    let orchestrator = goblin::build_orchestrator(&config);
    let outcome = orchestrator
        .run_analysis(&cli.symbol, &date, &session_id)
        .await;

    if cli.json {
        let output = if cli.pretty {
            serde_json::to_string_pretty(&outcome)
        } else {
            serde_json::to_string(&outcome)
        }
        .context("Failed to serialize outcome")?;
        println!("{output}");
    } else {
        print!("{}", goblin::report::render(&outcome));
    }

    goblin::finish(&outcome)
}
