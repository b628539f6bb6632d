//! Grid-based traffic density analysis.
//!
//! Every sample is binned into a (lat, lon, altitude band) cell. Cells keep
//! per-timestamp occupancy and the set of flights seen, from which peak
//! simultaneous density and cumulative traffic are derived.

use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::error::Result;
use crate::models::Trajectory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotConfig {
    pub lat_bucket_deg: f64,
    pub lon_bucket_deg: f64,
    pub altitude_band_ft: i32,
    /// Cells below this peak density are not reported.
    pub min_peak_density: usize,
    pub peak_weight: f64,
    pub unique_weight: f64,
    /// Maximum number of cells reported; `None` reports all.
    pub top_n: Option<usize>,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            lat_bucket_deg: 1.0,
            lon_bucket_deg: 1.0,
            altitude_band_ft: 2000,
            min_peak_density: 2,
            peak_weight: 2.0,
            unique_weight: 1.0,
            top_n: Some(10),
        }
    }
}

/// Labeled altitude range of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltitudeBand {
    pub index: i32,
    pub floor_ft: i64,
    pub ceiling_ft: i64,
    pub label: String,
}

impl AltitudeBand {
    fn new(index: i32, band_ft: i32) -> Self {
        let band_ft = i64::from(band_ft.max(1));
        let floor_ft = i64::from(index) * band_ft;
        let ceiling_ft = floor_ft + band_ft;
        Self {
            index,
            floor_ft,
            ceiling_ft,
            label: format!("FL{:03}-FL{:03}", floor_ft / 100, ceiling_ft / 100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotCell {
    pub lat_bucket: i32,
    pub lon_bucket: i32,
    pub altitude_band: AltitudeBand,
    pub peak_density: usize,
    pub unique_flights: usize,
    pub score: f64,
    pub time_start: i64,
    pub time_end: i64,
    pub occupied_samples: usize,
    pub flights: Vec<String>,
}

type CellKey = (i32, i32, i32);

#[derive(Debug, Default)]
struct CellAccumulator {
    occupancy: BTreeMap<i64, usize>,
    flights: BTreeSet<String>,
}

fn bucket(value: f64, step: f64) -> i32 {
    (value / step).floor() as i32
}

/// Density analyzer over a fixed grid.
#[derive(Debug, Clone, Default)]
pub struct HotspotAnalyzer {
    pub config: HotspotConfig,
}

impl HotspotAnalyzer {
    pub fn new(config: HotspotConfig) -> Self {
        Self { config }
    }

    fn cell_key(&self, lat: f64, lon: f64, altitude_ft: i32) -> CellKey {
        (
            bucket(lat, self.config.lat_bucket_deg),
            bucket(lon, self.config.lon_bucket_deg),
            altitude_ft.div_euclid(self.config.altitude_band_ft.max(1)),
        )
    }

    fn score(&self, peak_density: usize, unique_flights: usize) -> f64 {
        peak_density as f64 * self.config.peak_weight
            + unique_flights as f64 * self.config.unique_weight
    }

    /// Rank congested cells across all trajectories.
    pub fn analyze(
        &self,
        trajectories: &[Trajectory],
        deadline: &Deadline,
    ) -> Result<Vec<HotspotCell>> {
        let grid: DashMap<CellKey, CellAccumulator> = DashMap::new();

        // Shard locks on the grid serialize updates to the same cell.
        trajectories.par_iter().try_for_each(|trajectory| -> Result<()> {
            deadline.check()?;
            for point in &trajectory.points {
                let key = self.cell_key(point.lat, point.lon, point.altitude_ft);
                let mut cell = grid.entry(key).or_default();
                cell.flights.insert(trajectory.acid.clone());
                *cell.occupancy.entry(point.time).or_insert(0) += 1;
            }
            Ok(())
        })?;

        let mut cells: Vec<HotspotCell> = grid
            .into_iter()
            .filter_map(|((lat_bucket, lon_bucket, band), acc)| {
                let peak_density = acc.occupancy.values().copied().max().unwrap_or(0);
                if peak_density < self.config.min_peak_density.max(1) {
                    return None;
                }
                let time_start = acc.occupancy.keys().next().copied()?;
                let time_end = acc.occupancy.keys().next_back().copied()?;
                let unique_flights = acc.flights.len();
                Some(HotspotCell {
                    lat_bucket,
                    lon_bucket,
                    altitude_band: AltitudeBand::new(band, self.config.altitude_band_ft),
                    peak_density,
                    unique_flights,
                    score: self.score(peak_density, unique_flights),
                    time_start,
                    time_end,
                    occupied_samples: acc.occupancy.len(),
                    flights: acc.flights.into_iter().collect(),
                })
            })
            .collect();

        cells.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.peak_density.cmp(&a.peak_density))
                .then_with(|| {
                    (a.lat_bucket, a.lon_bucket, a.altitude_band.index).cmp(&(
                        b.lat_bucket,
                        b.lon_bucket,
                        b.altitude_band.index,
                    ))
                })
        });
        if let Some(limit) = self.config.top_n {
            cells.truncate(limit);
        }

        tracing::debug!(hotspots = cells.len(), "hotspot analysis complete");
        Ok(cells)
    }
}
