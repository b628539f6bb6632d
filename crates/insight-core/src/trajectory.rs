//! Trajectory synthesis from flight records.
//!
//! Flights fly their effective route at constant ground speed and hold
//! cruise altitude for the whole flight window. Positions are interpolated
//! linearly between waypoints, parameterized by great-circle distance.

use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};
use crate::models::{Flight, GeoPoint, Trajectory, TrajectoryPoint};
use crate::parsing::route_points;
use crate::spatial::{bearing, interpolate, segment_lengths_nm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Seconds between samples. Sample times are multiples of this value.
    pub sample_secs: i64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self { sample_secs: 60 }
    }
}

impl TrajectoryConfig {
    pub fn new(sample_secs: i64) -> Result<Self> {
        if sample_secs <= 0 {
            return Err(InsightError::InvalidConfig(format!(
                "sample_secs must be positive, got {sample_secs}"
            )));
        }
        Ok(Self { sample_secs })
    }
}

/// Route geometry plus schedule for one flight.
#[derive(Debug, Clone)]
pub struct FlightPath {
    points: Vec<GeoPoint>,
    /// Distance from the first point to each point.
    cumulative_nm: Vec<f64>,
    speed_kt: f64,
    altitude_ft: i32,
    departure_time: i64,
    arrival_time: i64,
}

impl FlightPath {
    pub fn for_flight(flight: &Flight) -> Result<Self> {
        if flight.speed_kt <= 0 {
            return Err(InsightError::malformed_route(
                &flight.acid,
                format!("speed must be positive, got {}kt", flight.speed_kt),
            ));
        }
        let points = route_points(flight)?;
        Self::from_points(flight, points)
    }

    pub(crate) fn from_points(flight: &Flight, points: Vec<GeoPoint>) -> Result<Self> {
        if points.len() < 2 {
            return Err(InsightError::malformed_route(
                &flight.acid,
                "route must include at least two waypoints",
            ));
        }

        let mut cumulative_nm = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative_nm.push(total);
        for length in segment_lengths_nm(&points) {
            total += length;
            cumulative_nm.push(total);
        }
        if total <= 0.0 || !total.is_finite() {
            return Err(InsightError::malformed_route(
                &flight.acid,
                "route distance must be positive",
            ));
        }

        let speed_kt = f64::from(flight.speed_kt);
        let duration_secs = (total / speed_kt * 3600.0).ceil() as i64;
        let arrival_time = flight
            .departure_time
            .checked_add(duration_secs)
            .ok_or_else(|| {
                InsightError::malformed_route(
                    &flight.acid,
                    format!("arrival time overflows from departure {}", flight.departure_time),
                )
            })?;

        Ok(Self {
            points,
            cumulative_nm,
            speed_kt,
            altitude_ft: flight.cruise_altitude_ft,
            departure_time: flight.departure_time,
            arrival_time,
        })
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn total_nm(&self) -> f64 {
        self.cumulative_nm.last().copied().unwrap_or(0.0)
    }

    pub fn departure_time(&self) -> i64 {
        self.departure_time
    }

    pub fn arrival_time(&self) -> i64 {
        self.arrival_time
    }

    /// Segment index and position after `distance_nm` along the route.
    fn locate(&self, distance_nm: f64) -> (usize, GeoPoint) {
        let distance_nm = distance_nm.clamp(0.0, self.total_nm());
        // First cumulative entry strictly beyond the distance ends the segment.
        let end = self
            .cumulative_nm
            .partition_point(|&d| d <= distance_nm)
            .clamp(1, self.points.len() - 1);
        let start = end - 1;
        let segment_len = self.cumulative_nm[end] - self.cumulative_nm[start];
        let t = if segment_len > 0.0 {
            ((distance_nm - self.cumulative_nm[start]) / segment_len).clamp(0.0, 1.0)
        } else {
            1.0
        };
        (start, interpolate(self.points[start], self.points[end], t))
    }

    fn distance_at(&self, time: i64) -> Option<f64> {
        if time < self.departure_time || time > self.arrival_time {
            return None;
        }
        let elapsed_hours = (time - self.departure_time) as f64 / 3600.0;
        Some(self.speed_kt * elapsed_hours)
    }

    /// Interpolated position at `time`, if the flight is airborne then.
    pub fn position_at(&self, time: i64) -> Option<GeoPoint> {
        self.distance_at(time).map(|d| self.locate(d).1)
    }

    /// Index of the route segment being flown at `time`.
    pub fn segment_at(&self, time: i64) -> Option<usize> {
        self.distance_at(time).map(|d| self.locate(d).0)
    }

    /// Track bearing of the segment flown at `time`.
    pub fn track_at(&self, time: i64) -> Option<f64> {
        let segment = self.segment_at(time)?;
        Some(bearing(self.points[segment], self.points[segment + 1]))
    }

    /// Sample the path on the global `step` grid.
    pub fn sample(&self, acid: &str, config: &TrajectoryConfig) -> Trajectory {
        let step = config.sample_secs.max(1);
        let mut points = Vec::new();
        let mut next = first_tick_at_or_after(self.departure_time, step);
        while let Some(time) = next.filter(|&t| t <= self.arrival_time) {
            if let Some(distance) = self.distance_at(time) {
                let (_, position) = self.locate(distance);
                points.push(TrajectoryPoint {
                    time,
                    lat: position.lat,
                    lon: position.lon,
                    altitude_ft: self.altitude_ft,
                });
            }
            next = time.checked_add(step);
        }

        Trajectory {
            acid: acid.to_string(),
            step_secs: step,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            points,
        }
    }
}

fn first_tick_at_or_after(time: i64, step: i64) -> Option<i64> {
    let remainder = time.rem_euclid(step);
    if remainder == 0 {
        Some(time)
    } else {
        time.checked_add(step - remainder)
    }
}

/// Build the sampled trajectory for one flight.
pub fn build_trajectory(flight: &Flight, config: &TrajectoryConfig) -> Result<Trajectory> {
    let path = FlightPath::for_flight(flight)?;
    Ok(path.sample(&flight.acid, config))
}
