//! Candidate generation, verification and ranking for detected conflicts.
//!
//! Every candidate is applied to a copy of its target flight, re-simulated
//! and re-checked against the other flight's unchanged trajectory. Only
//! candidates that leave the pair with no joint violation are ranked.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::FRAC_PI_2;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aircraft::envelope_for;
use crate::apply::Adjustment;
use crate::conflict::{Conflict, ConflictDetector};
use crate::deadline::Deadline;
use crate::error::Result;
use crate::models::{Flight, FlightAction, GeoPoint, Trajectory};
use crate::parsing::{format_waypoint, parse_waypoint};
use crate::scoring::ScoreWeights;
use crate::spatial::{great_circle_nm, offset_by_bearing};
use crate::trajectory::{build_trajectory, FlightPath, TrajectoryConfig};

/// Margin reported when the fixed pair no longer shares any sample.
const NO_OVERLAP_MARGIN: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub altitude_steps_ft: Vec<i32>,
    pub speed_steps_kt: Vec<i32>,
    pub delay_steps_min: Vec<i32>,
    pub reroute: bool,
    /// Perpendicular offset of the reroute waypoint from the conflict point.
    pub reroute_offset_nm: f64,
    /// Skip candidates that leave the aircraft's speed or altitude envelope.
    pub enforce_envelope: bool,
    /// Upper bound on ranked candidates per conflict.
    pub max_candidates: usize,
    pub weights: ScoreWeights,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            altitude_steps_ft: vec![1000, -1000, 2000, -2000],
            speed_steps_kt: vec![10, -10, 20, -20],
            delay_steps_min: vec![5, 10, 15],
            reroute: true,
            reroute_offset_nm: 20.0,
            enforce_envelope: true,
            max_candidates: 8,
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Altitude,
    Speed,
    Departure,
    Reroute,
}

impl From<&Adjustment> for ActionType {
    fn from(adjustment: &Adjustment) -> Self {
        match adjustment {
            Adjustment::Altitude { .. } => Self::Altitude,
            Adjustment::Speed { .. } => Self::Speed,
            Adjustment::Departure { .. } => Self::Departure,
            Adjustment::Reroute { .. } => Self::Reroute,
        }
    }
}

/// A verified fix for one conflict, targeting one of its two flights.
///
/// The flattened `action` carries `flight_id` and exactly one delta, in the
/// same shape Apply accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCandidate {
    pub pair_key: String,
    #[serde(flatten)]
    pub action: FlightAction,
    pub action_type: ActionType,
    pub summary: String,
    pub cost: f64,
    pub score: f64,
    pub margin: f64,
}

impl ResolutionCandidate {
    pub fn flight_id(&self) -> &str {
        &self.action.flight_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    pub config: ResolverConfig,
    pub detector: ConflictDetector,
    pub trajectory: TrajectoryConfig,
}

struct Job<'a> {
    flight: &'a Flight,
    other: &'a Trajectory,
    adjustment: Adjustment,
}

impl Resolver {
    pub fn new(
        config: ResolverConfig,
        detector: ConflictDetector,
        trajectory: TrajectoryConfig,
    ) -> Self {
        Self {
            config,
            detector,
            trajectory,
        }
    }

    /// Unverified adjustments worth trying on `flight` for `conflict`.
    pub fn candidate_adjustments(
        &self,
        flight: &Flight,
        conflict: &Conflict,
        other: &Trajectory,
    ) -> Vec<Adjustment> {
        let envelope = envelope_for(flight);
        let mut adjustments = Vec::new();

        for &delta_ft in &self.config.altitude_steps_ft {
            let altitude = flight.cruise_altitude_ft.saturating_add(delta_ft);
            if self.config.enforce_envelope
                && !(envelope.min_altitude_ft..=envelope.max_altitude_ft).contains(&altitude)
            {
                continue;
            }
            adjustments.push(Adjustment::Altitude { delta_ft });
        }

        for &delta_kt in &self.config.speed_steps_kt {
            let speed = flight.speed_kt.saturating_add(delta_kt);
            if speed <= 0 {
                continue;
            }
            if self.config.enforce_envelope
                && !(envelope.min_speed_kt..=envelope.max_speed_kt).contains(&speed)
            {
                continue;
            }
            adjustments.push(Adjustment::Speed { delta_kt });
        }

        adjustments.extend(
            self.config
                .delay_steps_min
                .iter()
                .filter(|&&minutes| minutes > 0)
                .map(|&delta_min| Adjustment::Departure { delta_min }),
        );

        if self.config.reroute && !flight.route.trim().is_empty() {
            if let Some(waypoint) = self.reroute_waypoint(flight, conflict, other) {
                adjustments.push(Adjustment::Reroute { waypoint });
            }
        }

        adjustments
    }

    /// Offset point beside the target's position at the worst instant, on
    /// the side away from the other aircraft.
    fn reroute_waypoint(
        &self,
        flight: &Flight,
        conflict: &Conflict,
        other: &Trajectory,
    ) -> Option<GeoPoint> {
        let path = FlightPath::for_flight(flight).ok()?;
        let position = path.position_at(conflict.time)?;
        let track = path.track_at(conflict.time)?;
        let other_position = other
            .sample_at(conflict.time)
            .map(|p| p.position())
            .unwrap_or_else(|| conflict.location());

        let offset = self.config.reroute_offset_nm;
        let right = offset_by_bearing(position, offset, track + FRAC_PI_2);
        let left = offset_by_bearing(position, offset, track - FRAC_PI_2);
        let away = if great_circle_nm(left, other_position) > great_circle_nm(right, other_position)
        {
            left
        } else {
            right
        };
        // Snap to the token precision Apply will parse back.
        parse_waypoint(&format_waypoint(away)).ok()
    }

    /// Apply, re-simulate and re-check one adjustment. `None` if it does not clear the pair.
    fn evaluate(&self, job: &Job<'_>, pair_key: &str) -> Option<ResolutionCandidate> {
        let revised = job.adjustment.apply_to(job.flight).ok()?;
        let trajectory = build_trajectory(&revised, &self.trajectory).ok()?;
        if self.detector.check_pair(&trajectory, job.other).is_some() {
            return None;
        }

        let margin = self
            .detector
            .closest_margin(&trajectory, job.other)
            .unwrap_or(NO_OVERLAP_MARGIN);
        let weights = &self.config.weights;
        let cost = weights.cost(&job.adjustment);

        Some(ResolutionCandidate {
            pair_key: pair_key.to_string(),
            action: FlightAction::from_adjustment(&job.flight.acid, &job.adjustment),
            action_type: ActionType::from(&job.adjustment),
            summary: format!("{}: {}", job.flight.acid, job.adjustment.summary()),
            cost,
            score: weights.score(cost, margin),
            margin,
        })
    }

    /// Ranked, verified candidates for one conflict.
    pub fn resolve(
        &self,
        conflict: &Conflict,
        flights: &HashMap<&str, &Flight>,
        trajectories: &HashMap<&str, &Trajectory>,
        deadline: &Deadline,
    ) -> Result<Vec<ResolutionCandidate>> {
        let mut jobs = Vec::new();
        for (target, other) in [
            (&conflict.flight_a, &conflict.flight_b),
            (&conflict.flight_b, &conflict.flight_a),
        ] {
            let (Some(&flight), Some(&other)) = (
                flights.get(target.as_str()),
                trajectories.get(other.as_str()),
            ) else {
                tracing::warn!(pair = %conflict.pair_key, flight = %target, "missing flight data for resolution");
                continue;
            };
            jobs.extend(
                self.candidate_adjustments(flight, conflict, other)
                    .into_iter()
                    .map(|adjustment| Job {
                        flight,
                        other,
                        adjustment,
                    }),
            );
        }

        let evaluated: Vec<Option<ResolutionCandidate>> = jobs
            .par_iter()
            .map(|job| {
                deadline.check()?;
                Ok(self.evaluate(job, &conflict.pair_key))
            })
            .collect::<Result<_>>()?;

        let tried = evaluated.len();
        let mut candidates: Vec<ResolutionCandidate> = evaluated.into_iter().flatten().collect();
        rank(&mut candidates);
        candidates.truncate(self.config.max_candidates);

        tracing::debug!(
            pair = %conflict.pair_key,
            tried,
            kept = candidates.len(),
            "resolution candidates evaluated"
        );
        Ok(candidates)
    }

    /// Candidates for every conflict, keyed by pair key.
    pub fn propose(
        &self,
        conflicts: &[Conflict],
        flights: &[Flight],
        trajectories: &[Trajectory],
        deadline: &Deadline,
    ) -> Result<BTreeMap<String, Vec<ResolutionCandidate>>> {
        let mut by_acid: HashMap<&str, &Flight> = HashMap::with_capacity(flights.len());
        for flight in flights {
            by_acid.entry(flight.acid.as_str()).or_insert(flight);
        }
        let flights = by_acid;
        let trajectories: HashMap<&str, &Trajectory> =
            trajectories.iter().map(|t| (t.acid.as_str(), t)).collect();

        conflicts
            .par_iter()
            .map(|conflict| {
                let candidates = self.resolve(conflict, &flights, &trajectories, deadline)?;
                Ok((conflict.pair_key.clone(), candidates))
            })
            .collect::<Result<Vec<_>>>()
            .map(|entries| entries.into_iter().collect())
    }
}

fn rank(candidates: &mut [ResolutionCandidate]) {
    candidates.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| a.cost.total_cmp(&b.cost))
            .then_with(|| a.flight_id().cmp(b.flight_id()))
            .then_with(|| a.summary.cmp(&b.summary))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_actions;
    use crate::error::InsightError;
    use std::time::Duration;

    fn flight(acid: &str, departure_time: i64) -> Flight {
        Flight {
            acid: acid.into(),
            plane_type: "Boeing 737-800".into(),
            route: "45.00N/75.00W 45.00N/70.00W".into(),
            cruise_altitude_ft: 32_000,
            departure_time,
            speed_kt: 450,
            passengers: Some(150),
            is_cargo: Some(false),
            departure_airport: None,
            arrival_airport: None,
        }
    }

    /// Head-on pair: same altitude, opposite directions on one route.
    fn head_on() -> Vec<Flight> {
        let mut b = flight("BBB2", 0);
        b.route = "45.00N/70.00W 45.00N/75.00W".into();
        vec![flight("AAA1", 0), b]
    }

    fn setup(flights: &[Flight]) -> (Resolver, Vec<Trajectory>, Vec<Conflict>) {
        let resolver = Resolver::default();
        let trajectories: Vec<Trajectory> = flights
            .iter()
            .map(|f| build_trajectory(f, &resolver.trajectory).unwrap())
            .collect();
        let conflicts = resolver
            .detector
            .detect(&trajectories, &Deadline::unbounded())
            .unwrap();
        (resolver, trajectories, conflicts)
    }

    #[test]
    fn every_candidate_clears_the_conflict() {
        let flights = head_on();
        let (resolver, trajectories, conflicts) = setup(&flights);
        assert_eq!(conflicts.len(), 1);

        let proposals = resolver
            .propose(&conflicts, &flights, &trajectories, &Deadline::unbounded())
            .unwrap();
        let candidates = &proposals["AAA1|BBB2"];
        assert!(!candidates.is_empty());
        assert!(candidates.len() <= resolver.config.max_candidates);

        for candidate in candidates {
            let revised = apply_actions(flights.clone(), &[candidate.action.clone()]).unwrap();
            let a = build_trajectory(&revised[0], &resolver.trajectory).unwrap();
            let b = build_trajectory(&revised[1], &resolver.trajectory).unwrap();
            assert!(
                resolver.detector.check_pair(&a, &b).is_none(),
                "{} does not clear",
                candidate.summary
            );
            assert!(candidate.margin >= 1.0);
        }
    }

    #[test]
    fn candidates_are_ranked_by_score() {
        let flights = head_on();
        let (resolver, trajectories, conflicts) = setup(&flights);
        let proposals = resolver
            .propose(&conflicts, &flights, &trajectories, &Deadline::unbounded())
            .unwrap();
        let candidates = &proposals["AAA1|BBB2"];
        assert!(candidates.windows(2).all(|w| w[0].score <= w[1].score));
        // Head-on at equal altitude: 1000 ft leaves them inside the vertical minimum.
        assert!(candidates
            .iter()
            .all(|c| c.action.delta_altitude_ft.map_or(true, |d| d.abs() == 2000)));
        assert!(candidates
            .iter()
            .any(|c| c.action_type == ActionType::Altitude));
        for candidate in candidates {
            let expected = resolver.config.weights.score(candidate.cost, candidate.margin);
            assert!((candidate.score - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn envelope_limits_altitude_steps() {
        let mut high = flight("AAA1", 0);
        high.cruise_altitude_ft = 44_000;
        let flights = vec![high.clone(), flight("BBB2", 60)];
        let (resolver, trajectories, _) = setup(&flights);
        let conflict = Conflict {
            pair_key: "AAA1|BBB2".into(),
            flight_a: "AAA1".into(),
            flight_b: "BBB2".into(),
            time: 600,
            min_horizontal_nm: 0.0,
            min_vertical_ft: 0.0,
            severity: 2.0,
            severity_band: crate::conflict::SeverityBand::Critical,
            start_time: 600,
            end_time: 600,
            violation_samples: 1,
            lat: 45.0,
            lon: -74.0,
            altitude_ft: 38_000.0,
        };

        let adjustments = resolver.candidate_adjustments(&high, &conflict, &trajectories[1]);
        assert!(adjustments.contains(&Adjustment::Altitude { delta_ft: 1000 }));
        assert!(!adjustments.contains(&Adjustment::Altitude { delta_ft: 2000 }));
        assert!(adjustments
            .iter()
            .any(|a| matches!(a, Adjustment::Reroute { .. })));

        let relaxed = Resolver::new(
            ResolverConfig {
                enforce_envelope: false,
                reroute: false,
                ..ResolverConfig::default()
            },
            ConflictDetector::default(),
            TrajectoryConfig::default(),
        );
        let adjustments = relaxed.candidate_adjustments(&high, &conflict, &trajectories[1]);
        assert!(adjustments.contains(&Adjustment::Altitude { delta_ft: 2000 }));
        assert!(!adjustments
            .iter()
            .any(|a| matches!(a, Adjustment::Reroute { .. })));
    }

    #[test]
    fn reroute_waypoint_sits_beside_the_track() {
        let flights = head_on();
        let (resolver, trajectories, conflicts) = setup(&flights);
        let conflict = &conflicts[0];
        let waypoint = resolver
            .reroute_waypoint(&flights[0], conflict, &trajectories[1])
            .unwrap();
        let position = FlightPath::for_flight(&flights[0])
            .unwrap()
            .position_at(conflict.time)
            .unwrap();
        let distance = great_circle_nm(position, waypoint);
        assert!((distance - 20.0).abs() < 0.1, "got {distance}");
    }

    #[test]
    fn expired_deadline_aborts() {
        let flights = head_on();
        let (resolver, trajectories, conflicts) = setup(&flights);
        let result = resolver.propose(
            &conflicts,
            &flights,
            &trajectories,
            &Deadline::after(Duration::ZERO),
        );
        assert!(matches!(result, Err(InsightError::AnalysisTimeout { .. })));
    }

    #[test]
    fn candidate_serializes_in_apply_shape() {
        let flights = head_on();
        let (resolver, trajectories, conflicts) = setup(&flights);
        let proposals = resolver
            .propose(&conflicts, &flights, &trajectories, &Deadline::unbounded())
            .unwrap();
        let value = serde_json::to_value(&proposals["AAA1|BBB2"][0]).unwrap();
        assert!(value["flight_id"].is_string());
        assert_eq!(value["pair_key"], "AAA1|BBB2");
        assert_eq!(value["action_type"], "altitude");
        assert!(value.get("delta_speed_kt").is_none());
    }
}
