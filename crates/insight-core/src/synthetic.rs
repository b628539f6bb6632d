//! Random but plausible flight batches for demos and load tests.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::aircraft::envelope_for;
use crate::models::{Flight, GeoPoint};
use crate::parsing::format_route;

const PLANE_TYPES: &[&str] = &[
    "Boeing 737-800",
    "Airbus A320",
    "Airbus A220-300",
    "Boeing 787-9",
    "Dash 8-400",
    "Embraer E195",
    "Cessna 208 prop",
];
const CRUISE_LEVELS_FT: &[i32] = &[18_000, 24_000, 30_000, 34_000, 36_000];
const SPEEDS_KT: &[i32] = &[260, 320, 420, 460];
const CABIN_SIZES: &[u32] = &[40, 90, 120, 180];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub count: usize,
    /// Departure time of the first flight, epoch seconds.
    pub base_time: i64,
    pub spacing_secs: i64,
    /// Fixed seed for reproducible batches.
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            count: 12,
            base_time: chrono::Utc::now().timestamp(),
            spacing_secs: 120,
            seed: None,
        }
    }
}

/// West-to-east corridor across the prairies into the Ottawa area.
fn random_route(rng: &mut impl Rng) -> String {
    let start = GeoPoint::new(
        49.5 + rng.random::<f64>(),
        -111.2 + rng.random::<f64>(),
    );
    let mid = GeoPoint::new(49.0 + rng.random::<f64>(), -95.0 + rng.random::<f64>());
    let end = GeoPoint::new(45.0 + rng.random::<f64>(), -76.5 + rng.random::<f64>());
    format_route(&[start, mid, end])
}

fn pick<T: Copy>(rng: &mut impl Rng, options: &[T], fallback: T) -> T {
    options.choose(rng).copied().unwrap_or(fallback)
}

pub fn generate(config: &SyntheticConfig) -> Vec<Flight> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    (0..config.count)
        .map(|i| {
            let mut flight = Flight {
                acid: format!("SIM{i:03}"),
                plane_type: pick(&mut rng, PLANE_TYPES, "Boeing 737-800").to_string(),
                route: random_route(&mut rng),
                cruise_altitude_ft: pick(&mut rng, CRUISE_LEVELS_FT, 30_000),
                departure_time: config.base_time + i as i64 * config.spacing_secs,
                speed_kt: pick(&mut rng, SPEEDS_KT, 420),
                passengers: None,
                is_cargo: None,
                departure_airport: None,
                arrival_airport: None,
            };

            // Keep the draw inside the type's envelope.
            let envelope = envelope_for(&flight);
            flight.speed_kt = flight
                .speed_kt
                .clamp(envelope.min_speed_kt, envelope.max_speed_kt);
            flight.cruise_altitude_ft = flight
                .cruise_altitude_ft
                .clamp(envelope.min_altitude_ft, envelope.max_altitude_ft);

            if rng.random_bool(1.0 / 3.0) {
                flight.is_cargo = Some(true);
            } else {
                flight.is_cargo = Some(false);
                flight.passengers = Some(pick(&mut rng, CABIN_SIZES, 120));
            }
            flight
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::validate_flight;
    use crate::parsing::route_points;

    fn seeded(count: usize) -> SyntheticConfig {
        SyntheticConfig {
            count,
            base_time: 1_736_150_400,
            spacing_secs: 120,
            seed: Some(7),
        }
    }

    #[test]
    fn generated_flights_are_valid() {
        let flights = generate(&seeded(25));
        assert_eq!(flights.len(), 25);
        for (i, flight) in flights.iter().enumerate() {
            assert_eq!(flight.acid, format!("SIM{i:03}"));
            assert_eq!(flight.departure_time, 1_736_150_400 + i as i64 * 120);
            assert_eq!(route_points(flight).unwrap().len(), 3);
            assert!(validate_flight(flight).is_empty(), "{:?}", validate_flight(flight));
        }
    }

    #[test]
    fn seed_makes_batches_reproducible() {
        assert_eq!(generate(&seeded(5)), generate(&seeded(5)));
    }
}
