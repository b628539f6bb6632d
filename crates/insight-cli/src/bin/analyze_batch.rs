//! Run the full analysis pipeline locally on a JSON flight batch.
//!
//! Usage:
//!   cargo run -p insight-cli --bin analyze_batch -- data/flights.json

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use insight_core::{parse_batch, AnalysisConfig, Analyzer, TrajectoryConfig};
use insight_cli::{read_batch, render_report};

#[derive(Parser, Debug)]
#[command(author, version, about = "Analyze a flight batch for conflicts, hotspots and resolutions")]
struct Args {
    /// JSON array of flight records
    input: PathBuf,

    /// Seconds between trajectory samples
    #[arg(long, default_value_t = 60)]
    sample_secs: i64,

    /// Analysis time budget in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Rows listed per section
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let batch = parse_batch(&read_batch(&args.input)?);
    let analyzer = Analyzer::new(AnalysisConfig {
        trajectory: TrajectoryConfig::new(args.sample_secs)?,
        timeout_ms: args.timeout_ms,
        ..AnalysisConfig::default()
    });

    let mut report = analyzer.analyze(&batch.flights, false)?;
    let mut issues = batch.issues;
    issues.append(&mut report.issues);
    report.issues = issues;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Flights: {}", batch.flights.len());
        print!("{}", render_report(&report, args.limit));
    }
    Ok(())
}
