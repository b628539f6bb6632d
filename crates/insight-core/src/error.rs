//! Error taxonomy for the analysis pipeline.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InsightError {
    /// Flight lacks resolvable geometry. Recovered per flight and surfaced via `issues`.
    #[error("{acid}: malformed route: {reason}")]
    MalformedRoute { acid: String, reason: String },

    #[error("invalid waypoint: {0:?}")]
    InvalidWaypoint(String),

    #[error("no flight data available")]
    NoData,

    #[error("unknown flight: {0}")]
    UnknownFlight(String),

    #[error("analysis exceeded its time budget ({elapsed_ms} ms > {budget_ms} ms)")]
    AnalysisTimeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl InsightError {
    pub fn malformed_route(acid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRoute {
            acid: acid.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
