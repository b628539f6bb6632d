//! Loss-of-separation detection across sampled trajectories.
//!
//! A pair is in conflict only when horizontal and vertical separation are
//! both below their minima at the same sampled instant.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::error::Result;
use crate::models::{GeoPoint, Trajectory, TrajectoryPoint};
use crate::spatial::{great_circle_nm, nm_per_deg_lat};

/// Separator between the two ACIDs of a pair key.
pub const PAIR_KEY_SEPARATOR: &str = "|";

/// Canonical key for an unordered flight pair.
pub fn pair_key(a: &str, b: &str) -> String {
    let (first, second) = canonical_pair(a, b);
    format!("{first}{PAIR_KEY_SEPARATOR}{second}")
}

fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Separation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeparationMinima {
    pub horizontal_nm: f64,
    pub vertical_ft: f64,
}

impl Default for SeparationMinima {
    fn default() -> Self {
        Self {
            horizontal_nm: 5.0,
            vertical_ft: 2000.0,
        }
    }
}

impl SeparationMinima {
    pub fn violated(&self, horizontal_nm: f64, vertical_ft: f64) -> bool {
        horizontal_nm < self.horizontal_nm && vertical_ft < self.vertical_ft
    }

    /// Combined normalized proximity in `[0, 2]`.
    pub fn severity(&self, horizontal_nm: f64, vertical_ft: f64) -> f64 {
        let horizontal = (1.0 - horizontal_nm / self.horizontal_nm).clamp(0.0, 1.0);
        let vertical = (1.0 - vertical_ft / self.vertical_ft).clamp(0.0, 1.0);
        horizontal + vertical
    }

    /// How far outside the minima a separation is; `>= 1.0` means clear.
    pub fn margin(&self, horizontal_nm: f64, vertical_ft: f64) -> f64 {
        (horizontal_nm / self.horizontal_nm).max(vertical_ft / self.vertical_ft)
    }
}

/// Severity bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    Medium,
    High,
    Critical,
}

impl SeverityBand {
    pub fn from_severity(severity: f64) -> Self {
        if severity >= 1.5 {
            Self::Critical
        } else if severity >= 1.0 {
            Self::High
        } else {
            Self::Medium
        }
    }
}

/// Detected conflict between two flights, measured at the worst instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub pair_key: String,
    pub flight_a: String,
    pub flight_b: String,
    /// Worst joint-violation instant.
    pub time: i64,
    pub min_horizontal_nm: f64,
    pub min_vertical_ft: f64,
    pub severity: f64,
    pub severity_band: SeverityBand,
    /// First and last jointly violating samples.
    pub start_time: i64,
    pub end_time: i64,
    pub violation_samples: usize,
    /// Midpoint of the two aircraft at the worst instant.
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
}

/// Pairwise detector over sampled trajectories.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    pub minima: SeparationMinima,
}

#[derive(Debug, Clone, Copy)]
struct WorstInstant {
    time: i64,
    horizontal_nm: f64,
    vertical_ft: f64,
    severity: f64,
    midpoint: (f64, f64, f64),
}

/// Lat/lon/altitude envelope of a trajectory, used to skip distant pairs.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
    min_alt: f64,
    max_alt: f64,
}

impl Bounds {
    fn of(trajectory: &Trajectory) -> Option<Self> {
        let first = trajectory.points.first()?;
        let init = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
            min_alt: f64::from(first.altitude_ft),
            max_alt: f64::from(first.altitude_ft),
        };
        Some(trajectory.points.iter().fold(init, |b, p| {
            let alt = f64::from(p.altitude_ft);
            Self {
                min_lat: b.min_lat.min(p.lat),
                max_lat: b.max_lat.max(p.lat),
                min_lon: b.min_lon.min(p.lon),
                max_lon: b.max_lon.max(p.lon),
                min_alt: b.min_alt.min(alt),
                max_alt: b.max_alt.max(alt),
            }
        }))
    }

    /// Conservative check: false only when the envelopes cannot come within the minima.
    fn may_conflict(&self, other: &Self, minima: &SeparationMinima) -> bool {
        let lat_gap_deg = minima.horizontal_nm / nm_per_deg_lat();
        let vertical_ok = self.min_alt - other.max_alt < minima.vertical_ft
            && other.min_alt - self.max_alt < minima.vertical_ft;
        let lat_ok = self.min_lat - other.max_lat < lat_gap_deg
            && other.min_lat - self.max_lat < lat_gap_deg;
        // Scale by the most poleward latitude so the longitude gap stays conservative.
        let lon_gap_deg = lat_gap_deg / max_lat_cos(self, other);
        let wraps = |b: &Self| b.min_lon - lon_gap_deg < -180.0 || b.max_lon + lon_gap_deg > 180.0;
        let lon_ok = wraps(self)
            || wraps(other)
            || (self.min_lon - other.max_lon < lon_gap_deg
                && other.min_lon - self.max_lon < lon_gap_deg);
        vertical_ok && lat_ok && lon_ok
    }
}

fn max_lat_cos(a: &Bounds, b: &Bounds) -> f64 {
    let extreme = a
        .min_lat
        .abs()
        .max(a.max_lat.abs())
        .max(b.min_lat.abs())
        .max(b.max_lat.abs());
    extreme.to_radians().cos().max(0.01)
}

impl ConflictDetector {
    pub fn new(minima: SeparationMinima) -> Self {
        Self { minima }
    }

    /// Horizontal and vertical separation between two samples.
    fn separation(a: &TrajectoryPoint, b: &TrajectoryPoint) -> (f64, f64) {
        let horizontal = great_circle_nm(a.position(), b.position());
        let vertical = (f64::from(a.altitude_ft) - f64::from(b.altitude_ft)).abs();
        (horizontal, vertical)
    }

    /// Visit every pair of samples sharing a timestamp, in time order.
    fn for_each_common_sample<F>(a: &Trajectory, b: &Trajectory, mut visit: F)
    where
        F: FnMut(&TrajectoryPoint, &TrajectoryPoint),
    {
        let (Some(a_start), Some(b_start), Some(a_end), Some(b_end)) =
            (a.start_time(), b.start_time(), a.end_time(), b.end_time())
        else {
            return;
        };
        let window_start = a_start.max(b_start);
        let window_end = a_end.min(b_end);
        if window_start > window_end {
            return;
        }

        let mut i = a.index_at_or_after(window_start);
        let mut j = b.index_at_or_after(window_start);
        while i < a.points.len() && j < b.points.len() {
            let pa = &a.points[i];
            let pb = &b.points[j];
            if pa.time > window_end || pb.time > window_end {
                break;
            }
            match pa.time.cmp(&pb.time) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    visit(pa, pb);
                    i += 1;
                    j += 1;
                }
            }
        }
    }

    /// Check one pair of trajectories for a joint violation.
    pub fn check_pair(&self, a: &Trajectory, b: &Trajectory) -> Option<Conflict> {
        if a.acid == b.acid {
            return None;
        }

        let mut worst: Option<WorstInstant> = None;
        let mut first_violation = i64::MAX;
        let mut last_violation = i64::MIN;
        let mut violation_samples = 0usize;

        Self::for_each_common_sample(a, b, |pa, pb| {
            let (horizontal, vertical) = Self::separation(pa, pb);
            if !self.minima.violated(horizontal, vertical) {
                return;
            }

            violation_samples += 1;
            first_violation = first_violation.min(pa.time);
            last_violation = last_violation.max(pa.time);

            let severity = self.minima.severity(horizontal, vertical);
            let replace = worst.map(|w| severity > w.severity).unwrap_or(true);
            if replace {
                worst = Some(WorstInstant {
                    time: pa.time,
                    horizontal_nm: horizontal,
                    vertical_ft: vertical,
                    severity,
                    midpoint: (
                        (pa.lat + pb.lat) / 2.0,
                        (pa.lon + pb.lon) / 2.0,
                        (f64::from(pa.altitude_ft) + f64::from(pb.altitude_ft)) / 2.0,
                    ),
                });
            }
        });

        let worst = worst?;
        let (flight_a, flight_b) = canonical_pair(&a.acid, &b.acid);

        Some(Conflict {
            pair_key: pair_key(flight_a, flight_b),
            flight_a: flight_a.to_string(),
            flight_b: flight_b.to_string(),
            time: worst.time,
            min_horizontal_nm: worst.horizontal_nm,
            min_vertical_ft: worst.vertical_ft,
            severity: worst.severity,
            severity_band: SeverityBand::from_severity(worst.severity),
            start_time: first_violation,
            end_time: last_violation,
            violation_samples,
            lat: worst.midpoint.0,
            lon: worst.midpoint.1,
            altitude_ft: worst.midpoint.2,
        })
    }

    /// Smallest normalized separation over the common window, `None` without overlap.
    pub fn closest_margin(&self, a: &Trajectory, b: &Trajectory) -> Option<f64> {
        let mut margin: Option<f64> = None;
        Self::for_each_common_sample(a, b, |pa, pb| {
            let (horizontal, vertical) = Self::separation(pa, pb);
            let m = self.minima.margin(horizontal, vertical);
            margin = Some(margin.map_or(m, |current| current.min(m)));
        });
        margin
    }

    /// Check every pair of trajectories.
    ///
    /// The pair space is split by first index across the rayon pool; the
    /// deadline is checked before each row so an overrun stops the scan.
    /// Results are sorted by severity, then pair key.
    pub fn detect(
        &self,
        trajectories: &[Trajectory],
        deadline: &Deadline,
    ) -> Result<Vec<Conflict>> {
        let bounds: Vec<Option<Bounds>> = trajectories.iter().map(Bounds::of).collect();
        let bounds = &bounds;
        let n = trajectories.len();

        let rows: Vec<Vec<Conflict>> = (0..n)
            .into_par_iter()
            .map(|i| -> Result<Vec<Conflict>> {
                deadline.check()?;
                let Some(bi) = bounds[i] else {
                    return Ok(Vec::new());
                };
                Ok((i + 1..n)
                    .filter_map(|j| {
                        let bj = bounds[j]?;
                        if !bi.may_conflict(&bj, &self.minima) {
                            return None;
                        }
                        self.check_pair(&trajectories[i], &trajectories[j])
                    })
                    .collect())
            })
            .collect::<Result<_>>()?;

        let mut conflicts: Vec<Conflict> = rows.into_iter().flatten().collect();
        sort_conflicts(&mut conflicts);
        tracing::debug!(flights = n, conflicts = conflicts.len(), "conflict detection complete");
        Ok(conflicts)
    }
}

fn sort_conflicts(conflicts: &mut [Conflict]) {
    conflicts.sort_by(|a, b| {
        b.severity
            .total_cmp(&a.severity)
            .then_with(|| a.pair_key.cmp(&b.pair_key))
    });
}

impl Conflict {
    /// Midpoint of the two aircraft at the worst instant.
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// The flight on the other side of the pair.
    pub fn other_flight(&self, acid: &str) -> Option<&str> {
        if acid == self.flight_a {
            Some(&self.flight_b)
        } else if acid == self.flight_b {
            Some(&self.flight_a)
        } else {
            None
        }
    }
}
