//! Heterogeneous memory controller CLI.
//!
//! This binary drives the controller from a memory trace. It performs:
//! 1. **Trace replay:** Feed `tick port R|W addr size` records to the controller,
//!    advancing simulated time between them, then flush and report counters.
//! 2. **Defaults:** Print the default configuration as JSON, a starting point for custom setups.

mod trace;

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::{fs, process};

use humsim_core::stats::CounterSnapshot;
use humsim_core::{Config, HumController, Response, SimContext};

#[derive(Parser, Debug)]
#[command(
    name = "humsim",
    author,
    version,
    about = "Heterogeneous memory migration controller",
    long_about = "Replay a memory trace through a near/far(/backup) migration controller.\n\nExamples:\n  humsim run --trace traces/stream.txt\n  humsim run --config hybrid.json --trace traces/stream.txt --json\n  humsim defaults > hybrid.json"
)]
struct Cli {
    /// Log verbosity when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and print the controller counters.
    Run {
        /// JSON configuration (built-in defaults when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Trace file with `tick port R|W addr size` lines.
        #[arg(short, long)]
        trace: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON.
    Defaults,
}

/// Outcome of a trace replay.
#[derive(Debug, Serialize)]
struct Report {
    records: usize,
    responses: usize,
    mean_latency: f64,
    max_latency: u64,
    final_tick: u64,
    counters: CounterSnapshot,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log);

    match cli.command {
        Commands::Run {
            config,
            trace,
            json,
        } => cmd_run(config, &trace, json),
        Commands::Defaults => cmd_defaults(),
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

fn cmd_defaults() {
    match serde_json::to_string_pretty(&Config::default()) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(e),
    }
}

/// Loads the configuration and trace, replays it and prints the report.
///
/// Exits with code 1 on any configuration, trace or controller error.
fn cmd_run(config: Option<PathBuf>, trace_path: &Path, json: bool) {
    let config = config
        .map_or_else(|| Ok(Config::default()), Config::from_json_file)
        .unwrap_or_else(|e| fail(e));

    let text = fs::read_to_string(trace_path)
        .unwrap_or_else(|e| fail(format!("cannot read {}: {e}", trace_path.display())));
    let records = trace::parse(&text).unwrap_or_else(|e| fail(e));
    tracing::info!(
        trace = %trace_path.display(),
        records = records.len(),
        policy = ?config.policy.kind,
        "replaying trace"
    );

    let report = replay(config, &records).unwrap_or_else(|e| fail(e));

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => fail(e),
        }
    } else {
        println!("records                          {}", report.records);
        println!("responses                        {}", report.responses);
        println!("mean_latency                     {:.1}", report.mean_latency);
        println!("max_latency                      {}", report.max_latency);
        println!("final_tick                       {}", report.final_tick);
        println!("{}", report.counters);
    }
}

/// Drives a fresh controller through `records` and flushes it.
fn replay(config: Config, records: &[trace::TraceRecord]) -> humsim_core::common::Result<Report> {
    let mut hum = HumController::new(config)?;
    let mut responses: Vec<Response> = Vec::with_capacity(records.len());

    for record in records {
        let ctx = SimContext::at(record.tick);
        responses.extend(hum.advance(&ctx)?);
        let _ = hum.submit(&ctx, record.to_request())?;
    }
    responses.extend(hum.shutdown()?);

    let total: u64 = responses.iter().map(Response::latency).sum();
    let mean_latency = if responses.is_empty() {
        0.0
    } else {
        total as f64 / responses.len() as f64
    };
    Ok(Report {
        records: records.len(),
        responses: responses.len(),
        mean_latency,
        max_latency: responses.iter().map(Response::latency).max().unwrap_or_default(),
        final_tick: responses.iter().map(|r| r.completed_at).max().unwrap_or_default(),
        counters: hum.counters(),
    })
}
