//! Core data models for flight analysis.

use chrono::DateTime;
use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A flight record as exchanged with the UI and the persisted data file.
///
/// Field names on the wire follow the data file ("ACID", "Plane type",
/// "departure time", ...). Snake-case names are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    #[serde(rename = "ACID", alias = "acid")]
    pub acid: String,
    #[serde(rename = "Plane type", alias = "plane_type", default)]
    pub plane_type: String,
    /// Space-separated waypoint tokens, e.g. `"49.97N/110.935W 49.00N/95.00W"`.
    #[serde(default)]
    pub route: String,
    #[serde(
        rename = "altitude",
        alias = "cruise_altitude_ft",
        deserialize_with = "de_integer"
    )]
    pub cruise_altitude_ft: i32,
    /// Seconds since the Unix epoch.
    #[serde(
        rename = "departure time",
        alias = "departure_time",
        deserialize_with = "de_epoch_seconds"
    )]
    pub departure_time: i64,
    #[serde(
        rename = "aircraft speed",
        alias = "speed_kt",
        deserialize_with = "de_integer"
    )]
    pub speed_kt: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passengers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cargo: Option<bool>,
    #[serde(
        rename = "departure airport",
        alias = "departure_airport",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub departure_airport: Option<String>,
    #[serde(
        rename = "arrival airport",
        alias = "arrival_airport",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub arrival_airport: Option<String>,
}

/// Sampled position of one flight at an absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub time: i64,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: i32,
}

impl TrajectoryPoint {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Time-ascending samples for one flight.
///
/// Sample times are multiples of `step_secs`, so trajectories built with
/// the same step share timestamps wherever their flight windows overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub acid: String,
    pub step_secs: i64,
    pub departure_time: i64,
    pub arrival_time: i64,
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn start_time(&self) -> Option<i64> {
        self.points.first().map(|p| p.time)
    }

    pub fn end_time(&self) -> Option<i64> {
        self.points.last().map(|p| p.time)
    }

    /// Index of the first sample at or after `time`.
    pub fn index_at_or_after(&self, time: i64) -> usize {
        self.points.partition_point(|p| p.time < time)
    }

    /// Sample at exactly `time`, if one exists.
    pub fn sample_at(&self, time: i64) -> Option<&TrajectoryPoint> {
        let idx = self.index_at_or_after(time);
        self.points.get(idx).filter(|p| p.time == time)
    }
}

/// A requested change to one flight, in the shape the UI sends to Apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightAction {
    pub flight_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_altitude_ft: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_speed_kt: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_departure_min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reroute_waypoint: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericInput {
    Int(i64),
    Float(f64),
    Text(String),
}

fn de_integer<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match NumericInput::deserialize(deserializer)? {
        NumericInput::Int(v) => v,
        NumericInput::Float(v) if v.is_finite() => v.round() as i64,
        NumericInput::Float(_) => return Err(D::Error::custom("expected a finite number")),
        NumericInput::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("expected integer, got {s:?}")))?,
    };
    i32::try_from(value).map_err(|_| D::Error::custom(format!("integer out of range: {value}")))
}

/// Accepts epoch seconds as a number, a numeric string or an RFC 3339 timestamp.
fn de_epoch_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumericInput::deserialize(deserializer)? {
        NumericInput::Int(v) => Ok(v),
        NumericInput::Float(v) if v.is_finite() => Ok(v.round() as i64),
        NumericInput::Float(_) => Err(D::Error::custom("departure time must be finite")),
        NumericInput::Text(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<i64>() {
                return Ok(v);
            }
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.timestamp())
                .map_err(|err| D::Error::custom(format!("invalid departure time {s:?}: {err}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flight_accepts_data_file_keys() {
        let flight: Flight = serde_json::from_value(json!({
            "ACID": "ACA101",
            "Plane type": "Boeing 737-800",
            "route": "49.97N/110.935W 49.00N/95.00W",
            "altitude": 34000,
            "departure time": 1_700_000_000,
            "aircraft speed": "450",
            "passengers": 150,
            "is_cargo": false
        }))
        .unwrap();

        assert_eq!(flight.acid, "ACA101");
        assert_eq!(flight.cruise_altitude_ft, 34000);
        assert_eq!(flight.speed_kt, 450);
        assert_eq!(flight.departure_airport, None);
    }

    #[test]
    fn flight_accepts_snake_case_and_rfc3339() {
        let flight: Flight = serde_json::from_value(json!({
            "acid": "WJA7",
            "plane_type": "jet",
            "cruise_altitude_ft": 30000,
            "departure_time": "2024-01-01T00:00:00Z",
            "speed_kt": 420,
            "departure_airport": "CYYC",
            "arrival_airport": "CYVR"
        }))
        .unwrap();

        assert_eq!(flight.departure_time, 1_704_067_200);
        assert_eq!(flight.route, "");
        assert_eq!(flight.arrival_airport.as_deref(), Some("CYVR"));
    }

    #[test]
    fn flight_serializes_with_data_file_keys() {
        let flight = Flight {
            acid: "X1".into(),
            plane_type: "jet".into(),
            route: "0N/0E 0N/1E".into(),
            cruise_altitude_ft: 30000,
            departure_time: 0,
            speed_kt: 360,
            passengers: Some(100),
            is_cargo: None,
            departure_airport: None,
            arrival_airport: None,
        };
        let value = serde_json::to_value(&flight).unwrap();
        assert_eq!(value["ACID"], "X1");
        assert_eq!(value["aircraft speed"], 360);
        assert_eq!(value["departure time"], 0);
        assert!(value.get("is_cargo").is_none());

        let back: Flight = serde_json::from_value(value).unwrap();
        assert_eq!(back, flight);
    }

    #[test]
    fn boolean_altitude_is_rejected() {
        let result = serde_json::from_value::<Flight>(json!({
            "ACID": "BAD",
            "altitude": true,
            "departure time": 0,
            "aircraft speed": 300
        }));
        assert!(result.is_err());
    }
}
