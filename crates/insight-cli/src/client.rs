//! Blocking HTTP client for the insight server.

use anyhow::{bail, Context, Result};
use insight_core::{AnalysisReport, Flight, FlightAction};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
struct ApplyRequest<'a> {
    flights: &'a [Flight],
    actions: &'a [FlightAction],
}

#[derive(Debug, Deserialize)]
struct ApplyResponse {
    revised: Vec<Flight>,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    count: usize,
}

pub struct InsightClient {
    client: Client,
    base_url: String,
}

fn check(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    bail!("{what} failed with {status}: {body}");
}

impl InsightClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn analyze(&self, batch: &[Value], include_trajectories: bool) -> Result<AnalysisReport> {
        let response = self
            .client
            .post(self.url("/v1/analyze"))
            .query(&[("include_trajectories", include_trajectories)])
            .json(batch)
            .send()
            .context("failed to reach insight server")?;
        check(response, "analyze")?
            .json()
            .context("invalid analysis report")
    }

    pub fn load(&self) -> Result<Vec<Flight>> {
        let response = self
            .client
            .get(self.url("/v1/flights"))
            .send()
            .context("failed to reach insight server")?;
        check(response, "load")?
            .json()
            .context("invalid flight batch")
    }

    /// Persist `flights` as the server baseline; returns the stored count.
    pub fn save(&self, flights: &[Flight]) -> Result<usize> {
        let response = self
            .client
            .put(self.url("/v1/flights"))
            .json(flights)
            .send()
            .context("failed to reach insight server")?;
        let saved: SaveResponse = check(response, "save")?.json()?;
        Ok(saved.count)
    }

    pub fn apply(&self, flights: &[Flight], actions: &[FlightAction]) -> Result<Vec<Flight>> {
        let response = self
            .client
            .post(self.url("/v1/apply"))
            .json(&ApplyRequest { flights, actions })
            .send()
            .context("failed to reach insight server")?;
        let applied: ApplyResponse = check(response, "apply")?.json()?;
        Ok(applied.revised)
    }
}
