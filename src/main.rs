use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridquery::app::{handle_fatal_error, init_logging, AppConfig};
use gridquery::query::{QueryPipeline, QueryRequest};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filter, search, sort, group, page and aggregate JSON records with data-grid requests
#[derive(Parser)]
#[command(name = "gridquery", version)]
#[command(about = "Shape JSON record sets with data-grid query requests", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a shaping configuration file (TOML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a request against a JSON array and print the result envelope
    Run {
        /// JSON file holding the record array
        #[arg(short, long)]
        data: PathBuf,

        /// JSON file holding the wire request
        #[arg(short, long)]
        request: PathBuf,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// Validate a wire request and print what it would do
    Check {
        /// JSON file holding the wire request
        #[arg(short, long)]
        request: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let pretty = matches!(cli.command, Commands::Run { pretty: true, .. });
    let config = AppConfig::new(cli.verbose)
        .with_config_path(cli.config.clone())
        .with_pretty(pretty);
    init_logging(&config);

    if let Err(err) = run(cli.command, &config) {
        handle_fatal_error(err, config.verbose);
    }
}

fn run(command: Commands, config: &AppConfig) -> Result<()> {
    let shaping = config.shaping_config()?;

    match command {
        Commands::Run { data, request, .. } => {
            let data = read_json(&data)?;
            let request = read_json(&request)?;
            let pipeline = QueryPipeline::new(shaping);
            let output = pipeline
                .execute_json(&data, &request)
                .context("Failed to execute request")?;
            debug!("Produced {} top-level entries", output.result.len());
            println!("{}", config.render(&output)?);
        }
        Commands::Check { request } => {
            let json = read_json(&request)?;
            let parsed = QueryRequest::from_json(&json, &shaping)
                .with_context(|| format!("Invalid request in {}", request.display()))?;
            let summary = parsed.summary();
            if summary.is_empty() {
                println!("request is valid and returns every record unchanged");
            } else {
                println!("request is valid");
                for line in summary {
                    println!("  {}", line);
                }
            }
        }
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {}", path.display()))
}
