//! Insight CLI - command line tools for flight batch analysis.
//!
//! Binaries:
//! - analyze_batch: run the pipeline locally on a JSON batch
//! - generate_flights: write a synthetic batch
//! - submit_batch: post a batch to a running server

pub mod client;
pub mod report;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

pub use client::InsightClient;
pub use report::render_report;

/// Read a JSON array of raw flight records from disk.
pub fn read_batch(path: &Path) -> Result<Vec<Value>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not a JSON array of flights", path.display()))
}
