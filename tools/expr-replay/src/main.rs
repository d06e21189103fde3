//! expr-replay - Replay CSV telemetry through a voltage-expr expression
//!
//! Loads a postfix definition, assigns each CSV record's cells to the
//! expression's variables, evaluates once per record and prints the result.

mod config;
mod records;
mod replay;

use crate::config::{Definition, OutputFormat, ReplayConfig};
use crate::records::RecordReader;
use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "expr-replay")]
#[command(about = "Replay CSV telemetry records through a postfix expression")]
#[command(long_about = "Replay CSV telemetry records through a postfix expression

The definition is a YAML document:
  name: avg_power
  postfix: [P, 10, RunningAverage]

Records are a CSV file with a time column (RFC 3339, 'YYYY-MM-DD HH:MM:SS'
or integer nanoseconds) and one column per variable. Empty cells leave the
variable unchanged for that record.

Examples:
  expr-replay -d power.yaml -r data.csv
  expr-replay -d power.yaml -r data.csv --format json --time-column ts")]
#[command(version)]
struct Cli {
    /// Expression definition (YAML)
    #[arg(short, long, env = "EXPR_REPLAY_DEFINITION")]
    definition: PathBuf,

    /// Telemetry records (CSV)
    #[arg(short, long, env = "EXPR_REPLAY_RECORDS")]
    records: PathBuf,

    /// Name of the time column [default: time]
    #[arg(short, long)]
    time_column: Option<String>,

    /// Replay configuration file (YAML)
    #[arg(short, long, env = "EXPR_REPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Output format [default: text]
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries the replay output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = ReplayConfig::load(cli.config.as_deref())?;
    if let Some(time_column) = cli.time_column {
        config.time_column = time_column;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }

    let definition = Definition::load(&cli.definition)?;
    let mut expr = definition.compile(&config.expression)?;
    info!(
        name = %definition.name,
        tokens = expr.tokens().len(),
        variables = expr.variables().len(),
        stateful = expr.is_stateful(),
        "Expression loaded"
    );

    let records = RecordReader::open(&cli.records, &config.time_column)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = replay::replay(&mut expr, records, config.format, &mut out)?;
    out.flush()?;

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
