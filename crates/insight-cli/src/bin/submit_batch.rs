//! Submit a flight batch to a running insight server and print the report.
//!
//! Usage:
//!   cargo run -p insight-cli --bin submit_batch -- data/flights.json --save --apply-best
//!   cargo run -p insight-cli --bin submit_batch            # analyze the stored baseline

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use insight_cli::{read_batch, render_report, InsightClient};
use insight_core::{parse_batch, Flight};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(author, version, about = "Analyze a flight batch on an insight server")]
struct Args {
    /// JSON array of flight records (the server baseline when omitted)
    input: Option<PathBuf>,

    /// Insight Server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Store the batch as the server baseline first
    #[arg(long)]
    save: bool,

    /// Apply the recommended fix for each conflict and re-analyze
    #[arg(long)]
    apply_best: bool,

    /// Rows listed per section
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

fn to_values(flights: &[Flight]) -> Result<Vec<Value>> {
    Ok(flights
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()?)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let client = InsightClient::new(args.url);
    let batch = match &args.input {
        Some(path) => read_batch(path)?,
        None => to_values(&client.load()?)?,
    };

    if args.save {
        let flights = parse_batch(&batch).flights;
        let count = client.save(&flights)?;
        println!("Saved {count} flights as baseline");
    }

    let report = client.analyze(&batch, false)?;
    print!("{}", render_report(&report, args.limit));

    if args.apply_best && !report.proposals.is_empty() {
        let actions: Vec<_> = report
            .proposals
            .values()
            .filter_map(|candidates| candidates.first())
            .map(|best| best.action.clone())
            .collect();
        let flights = parse_batch(&batch).flights;
        let revised = client.apply(&flights, &actions)?;
        println!("Applied {} recommended fixes, re-analyzing...", actions.len());

        let report = client.analyze(&to_values(&revised)?, false)?;
        print!("{}", render_report(&report, args.limit));
    }
    Ok(())
}
