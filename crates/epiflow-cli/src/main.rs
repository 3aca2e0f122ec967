//! epiflow CLI: run, validate and explain query documents.

use clap::{Parser, Subcommand};
use epiflow_core::config::ClientConfig;
use epiflow_io::context_from_config;
use epiflow_operators::render_plan;
use epiflow_query::{lapis_source, parse_request, QueryRequest, RequestConfig};
use std::fs;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "epiflow")]
#[command(about = "Prevalence and sequence counts over time from an aggregate query endpoint", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a query document and print the result as JSON
    Run {
        /// Path to the request YAML/JSON file
        #[arg(short, long)]
        request: PathBuf,

        /// Endpoint base URL (overrides env and document)
        #[arg(long)]
        lapis: Option<String>,

        /// Transport timeout in milliseconds (overrides env and document)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print one row per date range instead of one series per numerator
        #[arg(long)]
        table: bool,
    },

    /// Validate a request document
    Validate {
        /// Path to the request YAML/JSON file
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Show the operator tree of every numerator pipeline (EXPLAIN)
    Explain {
        /// Path to the request YAML/JSON file
        #[arg(short, long)]
        request: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            request,
            lapis,
            timeout_ms,
            table,
        } => {
            if let Err(e) = run_request(&request, lapis, timeout_ms, table).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { request } => {
            if let Err(e) = validate_request(&request) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Request is valid");
        }
        Commands::Explain { request } => {
            if let Err(e) = explain_request(&request) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();

    debug!("epiflow started with verbosity level: {}", verbose);
}

fn load_request(path: &PathBuf) -> Result<QueryRequest, Box<dyn std::error::Error>> {
    let src = fs::read_to_string(path)?;
    Ok(parse_request(&src)?)
}

async fn run_request(
    request_path: &PathBuf,
    lapis: Option<String>,
    timeout_ms: Option<u64>,
    table: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = load_request(request_path)?;

    let config = resolve_config(ClientConfig::from_env(), &request.config, lapis, timeout_ms);

    let cancel = CancellationToken::new();
    let ctx = context_from_config(&config)?.with_cancellation(cancel.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight fetches");
            cancel.cancel();
        }
    });

    let output = request.run(&ctx).await?;
    let json = if table {
        serde_json::to_string_pretty(&output.table(request.granularity)?)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{json}");

    Ok(())
}

fn validate_request(request_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let _ = load_request(request_path)?;
    Ok(())
}

fn explain_request(request_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let request = load_request(request_path)?;
    let plans = request.build(&lapis_source())?;

    println!("Query Plan");
    println!("==========");
    println!();
    println!("Query: {:?}", request.query);
    println!("Granularity: {}", request.granularity);
    println!("Smoothing Window: {}", request.smoothing_window);
    if let Some(url) = &request.config.lapis_url {
        println!("Endpoint: {url}");
    }
    for (display_name, plan) in &plans {
        println!();
        println!("{display_name}:");
        print!("{}", render_plan(plan.as_ref()));
    }

    Ok(())
}

/// env < document < CLI.
fn resolve_config(
    env: ClientConfig,
    doc: &RequestConfig,
    lapis: Option<String>,
    timeout_ms: Option<u64>,
) -> ClientConfig {
    let mut config = env;
    doc.apply(&mut config);
    if let Some(url) = lapis {
        config.lapis_url = url;
    }
    if let Some(ms) = timeout_ms {
        config.timeout_ms = Some(ms);
    }
    config
}
