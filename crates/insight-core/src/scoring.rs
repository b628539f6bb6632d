//! Operational cost model for resolution candidates.

use serde::{Deserialize, Serialize};

use crate::apply::Adjustment;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub delay_per_min: f64,
    pub speed_per_kt: f64,
    pub altitude_per_1000ft: f64,
    /// Fixed disruption penalty for any reroute.
    pub reroute_penalty: f64,
    /// Score reduction per unit of margin beyond the minima, capped at one unit.
    pub margin_bonus: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            delay_per_min: 0.10,
            speed_per_kt: 0.02,
            altitude_per_1000ft: 0.30,
            reroute_penalty: 1.5,
            margin_bonus: 0.25,
        }
    }
}

impl ScoreWeights {
    /// Weighted delay, fuel and disruption cost of an adjustment.
    pub fn cost(&self, adjustment: &Adjustment) -> f64 {
        match adjustment {
            Adjustment::Altitude { delta_ft } => {
                f64::from(delta_ft.unsigned_abs()) / 1000.0 * self.altitude_per_1000ft
            }
            Adjustment::Speed { delta_kt } => {
                f64::from(delta_kt.unsigned_abs()) * self.speed_per_kt
            }
            Adjustment::Departure { delta_min } => {
                f64::from(delta_min.unsigned_abs()) * self.delay_per_min
            }
            Adjustment::Reroute { .. } => self.reroute_penalty,
        }
    }

    /// Final ranking value; lower ranks first.
    pub fn score(&self, cost: f64, margin: f64) -> f64 {
        let extra = (margin - 1.0).clamp(0.0, 1.0);
        cost - self.margin_bonus * extra
    }
}
