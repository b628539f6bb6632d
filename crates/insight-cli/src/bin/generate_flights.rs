//! Write a synthetic flight batch in the data-file format.
//!
//! Usage:
//!   cargo run -p insight-cli --bin generate_flights -- --count 40 --output data/flights.json

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use insight_core::{generate, SyntheticConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a random but plausible flight batch")]
struct Args {
    /// Number of flights
    #[arg(long, default_value_t = 12)]
    count: usize,

    /// Seconds between consecutive departures
    #[arg(long, default_value_t = 120)]
    spacing_secs: i64,

    /// First departure as RFC 3339 (defaults to now)
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Seed for a reproducible batch
    #[arg(long)]
    seed: Option<u64>,

    /// Output file (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let flights = generate(&SyntheticConfig {
        count: args.count,
        base_time: args.start.unwrap_or_else(Utc::now).timestamp(),
        spacing_secs: args.spacing_secs,
        seed: args.seed,
    });
    let payload = serde_json::to_string_pretty(&flights)?;

    match args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, payload)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {} flights to {}", flights.len(), path.display());
        }
        None => println!("{payload}"),
    }
    Ok(())
}
