//! End-to-end analysis: trajectories, conflicts, hotspots and proposals.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::conflict::{Conflict, ConflictDetector, SeparationMinima, PAIR_KEY_SEPARATOR};
use crate::deadline::Deadline;
use crate::error::Result;
use crate::hotspot::{HotspotAnalyzer, HotspotCell, HotspotConfig};
use crate::models::{Flight, Trajectory};
use crate::resolver::{ResolutionCandidate, Resolver, ResolverConfig};
use crate::trajectory::{build_trajectory, TrajectoryConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub trajectory: TrajectoryConfig,
    pub minima: SeparationMinima,
    pub hotspot: HotspotConfig,
    pub resolver: ResolverConfig,
    /// Wall-clock budget for one call.
    pub timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trajectory: TrajectoryConfig::default(),
            minima: SeparationMinima::default(),
            hotspot: HotspotConfig::default(),
            resolver: ResolverConfig::default(),
            timeout_ms: 30_000,
        }
    }
}

/// The full Analyze response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub conflicts: Vec<Conflict>,
    pub hotspots: Vec<HotspotCell>,
    pub proposals: BTreeMap<String, Vec<ResolutionCandidate>>,
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectories: Option<Vec<Trajectory>>,
}

/// Trajectories for every flight that could be simulated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryBatch {
    pub trajectories: Vec<Trajectory>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn deadline(&self) -> Deadline {
        Deadline::after(Duration::from_millis(self.config.timeout_ms))
    }

    fn detector(&self) -> ConflictDetector {
        ConflictDetector::new(self.config.minima)
    }

    fn resolver(&self) -> Resolver {
        Resolver::new(
            self.config.resolver.clone(),
            self.detector(),
            self.config.trajectory,
        )
    }

    /// Simulate every flight; failures are skipped and reported.
    fn simulate(&self, flights: &[Flight], deadline: &Deadline) -> Result<TrajectoryBatch> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        let unique: Vec<&Flight> = flights
            .iter()
            .filter(|f| {
                if f.acid.contains(PAIR_KEY_SEPARATOR) {
                    issues.push(format!(
                        "{}: ACID must not contain '{PAIR_KEY_SEPARATOR}', flight skipped",
                        f.acid
                    ));
                    return false;
                }
                let fresh = seen.insert(f.acid.as_str());
                if !fresh {
                    issues.push(format!("{}: duplicate ACID skipped", f.acid));
                }
                fresh
            })
            .collect();

        let results: Vec<Result<Trajectory>> = unique
            .par_iter()
            .map(|flight| -> Result<Result<Trajectory>> {
                deadline.check()?;
                Ok(build_trajectory(flight, &self.config.trajectory))
            })
            .collect::<Result<_>>()?;

        let mut trajectories = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(trajectory) => trajectories.push(trajectory),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping flight");
                    issues.push(err.to_string());
                }
            }
        }

        deadline.check()?;
        tracing::debug!(
            flights = flights.len(),
            trajectories = trajectories.len(),
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            "trajectories built"
        );
        Ok(TrajectoryBatch {
            trajectories,
            issues,
        })
    }

    pub fn trajectories(&self, flights: &[Flight]) -> Result<TrajectoryBatch> {
        self.simulate(flights, &self.deadline())
    }

    pub fn conflicts(&self, flights: &[Flight]) -> Result<(Vec<Conflict>, Vec<String>)> {
        let deadline = self.deadline();
        let batch = self.simulate(flights, &deadline)?;
        let conflicts = self.detector().detect(&batch.trajectories, &deadline)?;
        Ok((conflicts, batch.issues))
    }

    pub fn hotspots(&self, flights: &[Flight]) -> Result<(Vec<HotspotCell>, Vec<String>)> {
        let deadline = self.deadline();
        let batch = self.simulate(flights, &deadline)?;
        let hotspots = HotspotAnalyzer::new(self.config.hotspot.clone())
            .analyze(&batch.trajectories, &deadline)?;
        Ok((hotspots, batch.issues))
    }

    /// Run every stage under one deadline.
    ///
    /// Each stage checks the deadline per unit of work, so an overrun stops
    /// the call promptly; no partial report is returned.
    pub fn analyze(&self, flights: &[Flight], include_trajectories: bool) -> Result<AnalysisReport> {
        let deadline = self.deadline();
        let batch = self.simulate(flights, &deadline)?;

        let conflicts = self.detector().detect(&batch.trajectories, &deadline)?;
        let hotspots = HotspotAnalyzer::new(self.config.hotspot.clone())
            .analyze(&batch.trajectories, &deadline)?;

        let proposals = self
            .resolver()
            .propose(&conflicts, flights, &batch.trajectories, &deadline)?;
        deadline.check()?;

        tracing::info!(
            flights = flights.len(),
            conflicts = conflicts.len(),
            hotspots = hotspots.len(),
            issues = batch.issues.len(),
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            "analysis complete"
        );

        Ok(AnalysisReport {
            conflicts,
            hotspots,
            proposals,
            issues: batch.issues,
            trajectories: include_trajectories.then_some(batch.trajectories),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsightError;

    fn flight(acid: &str, route: &str) -> Flight {
        Flight {
            acid: acid.into(),
            plane_type: "Airbus A320".into(),
            route: route.into(),
            cruise_altitude_ft: 34_000,
            departure_time: 1_736_150_400,
            speed_kt: 450,
            passengers: Some(120),
            is_cargo: Some(false),
            departure_airport: None,
            arrival_airport: None,
        }
    }

    #[test]
    fn malformed_flights_become_issues() {
        let flights = vec![
            flight("GOOD1", "45.00N/75.00W 46.00N/73.00W"),
            flight("BAD1", "45.00N/75.00W"),
            flight("GOOD1", "45.00N/75.00W 46.00N/73.00W"),
        ];
        let report = Analyzer::default().analyze(&flights, true).unwrap();

        assert_eq!(report.trajectories.as_ref().map(Vec::len), Some(1));
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues.iter().any(|i| i.starts_with("BAD1")));
        assert!(report.issues.iter().any(|i| i.contains("duplicate")));
    }

    #[test]
    fn trajectories_are_omitted_unless_requested() {
        let flights = vec![flight("GOOD1", "45.00N/75.00W 46.00N/73.00W")];
        let report = Analyzer::default().analyze(&flights, false).unwrap();
        assert!(report.trajectories.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("trajectories").is_none());
    }

    #[test]
    fn extreme_inputs_are_reported_not_fatal() {
        let mut late = flight("LATE1", "45.00N/75.00W 46.00N/73.00W");
        late.departure_time = i64::MAX - 100;
        let mut high_a = flight("HIGH1", "45.00N/75.00W 46.00N/73.00W");
        high_a.cruise_altitude_ft = i32::MAX - 10;
        let mut high_b = flight("HIGH2", "45.00N/75.00W 46.00N/73.00W");
        high_b.cruise_altitude_ft = i32::MAX - 10;

        let report = Analyzer::default()
            .analyze(&[late, high_a, high_b], false)
            .unwrap();
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].starts_with("LATE1"));
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].pair_key, "HIGH1|HIGH2");
    }

    #[test]
    fn separator_in_acid_is_skipped() {
        let flights = vec![
            flight("A|B", "45.00N/75.00W 46.00N/73.00W"),
            flight("C", "45.00N/75.00W 46.00N/73.00W"),
        ];
        let batch = Analyzer::default().trajectories(&flights).unwrap();
        assert_eq!(batch.trajectories.len(), 1);
        assert_eq!(batch.trajectories[0].acid, "C");
        assert!(batch.issues[0].starts_with("A|B"));
    }

    #[test]
    fn zero_budget_times_out() {
        let analyzer = Analyzer::new(AnalysisConfig {
            timeout_ms: 0,
            ..AnalysisConfig::default()
        });
        let flights = vec![flight("GOOD1", "45.00N/75.00W 46.00N/73.00W")];
        assert!(matches!(
            analyzer.analyze(&flights, false),
            Err(InsightError::AnalysisTimeout { .. })
        ));
    }
}
