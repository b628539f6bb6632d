//! Server configuration from environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use insight_core::{AnalysisConfig, HotspotConfig, ResolverConfig, ScoreWeights, TrajectoryConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Baseline flight batch served by Load and replaced by Save.
    pub data_path: PathBuf,
    pub sample_secs: i64,
    pub analysis_timeout_ms: u64,
    pub hotspot_cell_deg: f64,
    pub hotspot_top_n: usize,
    pub weights: ScoreWeights,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = ScoreWeights::default();
        Self {
            server_port: env_or("INSIGHT_PORT", 3000),
            data_path: env::var("INSIGHT_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/flights.json")),
            sample_secs: env_or("INSIGHT_SAMPLE_SECS", 60),
            analysis_timeout_ms: env_or("INSIGHT_ANALYSIS_TIMEOUT_MS", 30_000),
            hotspot_cell_deg: env_or("INSIGHT_HOTSPOT_CELL_DEG", 1.0),
            hotspot_top_n: env_or("INSIGHT_HOTSPOT_TOP_N", 10),
            weights: ScoreWeights {
                delay_per_min: env_or("INSIGHT_WEIGHT_DELAY", defaults.delay_per_min),
                speed_per_kt: env_or("INSIGHT_WEIGHT_SPEED", defaults.speed_per_kt),
                altitude_per_1000ft: env_or(
                    "INSIGHT_WEIGHT_ALTITUDE",
                    defaults.altitude_per_1000ft,
                ),
                reroute_penalty: env_or("INSIGHT_WEIGHT_REROUTE", defaults.reroute_penalty),
                margin_bonus: env_or("INSIGHT_WEIGHT_MARGIN", defaults.margin_bonus),
            },
        }
    }

    /// Core analysis settings derived from this configuration.
    pub fn analysis_config(&self) -> insight_core::Result<AnalysisConfig> {
        if !(self.hotspot_cell_deg > 0.0) {
            return Err(insight_core::InsightError::InvalidConfig(format!(
                "hotspot cell size must be positive, got {}",
                self.hotspot_cell_deg
            )));
        }

        Ok(AnalysisConfig {
            trajectory: TrajectoryConfig::new(self.sample_secs)?,
            hotspot: HotspotConfig {
                lat_bucket_deg: self.hotspot_cell_deg,
                lon_bucket_deg: self.hotspot_cell_deg,
                top_n: Some(self.hotspot_top_n),
                ..HotspotConfig::default()
            },
            resolver: ResolverConfig {
                weights: self.weights,
                ..ResolverConfig::default()
            },
            timeout_ms: self.analysis_timeout_ms,
            ..AnalysisConfig::default()
        })
    }
}
