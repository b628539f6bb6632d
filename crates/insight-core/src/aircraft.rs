//! Aircraft performance envelopes and plausibility checks.

use serde::{Deserialize, Serialize};

use crate::models::Flight;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AircraftCategory {
    Jet,
    Turboprop,
    Prop,
    Helicopter,
}

/// Speed and altitude limits for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_speed_kt: i32,
    pub max_speed_kt: i32,
    pub min_altitude_ft: i32,
    pub max_altitude_ft: i32,
}

impl Envelope {
    pub fn contains(&self, speed_kt: i32, altitude_ft: i32) -> bool {
        (self.min_speed_kt..=self.max_speed_kt).contains(&speed_kt)
            && (self.min_altitude_ft..=self.max_altitude_ft).contains(&altitude_ft)
    }
}

impl AircraftCategory {
    pub fn envelope(self) -> Envelope {
        match self {
            Self::Jet => Envelope {
                min_speed_kt: 200,
                max_speed_kt: 550,
                min_altitude_ft: 10_000,
                max_altitude_ft: 45_000,
            },
            Self::Turboprop => Envelope {
                min_speed_kt: 150,
                max_speed_kt: 450,
                min_altitude_ft: 5_000,
                max_altitude_ft: 41_000,
            },
            Self::Prop => Envelope {
                min_speed_kt: 90,
                max_speed_kt: 220,
                min_altitude_ft: 1_000,
                max_altitude_ft: 18_000,
            },
            Self::Helicopter => Envelope {
                min_speed_kt: 60,
                max_speed_kt: 160,
                min_altitude_ft: 0,
                max_altitude_ft: 10_000,
            },
        }
    }
}

// Longer names first so "737 max 8" wins over "737".
const KNOWN_TYPES: &[(&str, AircraftCategory)] = &[
    ("boeing 787", AircraftCategory::Jet),
    ("boeing 777", AircraftCategory::Jet),
    ("boeing 767", AircraftCategory::Jet),
    ("boeing 757", AircraftCategory::Jet),
    ("boeing 737", AircraftCategory::Jet),
    ("airbus a330", AircraftCategory::Jet),
    ("airbus a321", AircraftCategory::Jet),
    ("airbus a320", AircraftCategory::Jet),
    ("airbus a300", AircraftCategory::Jet),
    ("airbus a220", AircraftCategory::Jet),
    ("dash 8", AircraftCategory::Turboprop),
    ("dash-8", AircraftCategory::Turboprop),
    ("q400", AircraftCategory::Turboprop),
    ("embraer", AircraftCategory::Turboprop),
    ("e195", AircraftCategory::Turboprop),
    ("crj", AircraftCategory::Turboprop),
    ("787", AircraftCategory::Jet),
    ("777", AircraftCategory::Jet),
    ("767", AircraftCategory::Jet),
    ("757", AircraftCategory::Jet),
    ("737", AircraftCategory::Jet),
    ("a330", AircraftCategory::Jet),
    ("a321", AircraftCategory::Jet),
    ("a320", AircraftCategory::Jet),
    ("a300", AircraftCategory::Jet),
    ("a220", AircraftCategory::Jet),
];

/// Classify a free-text plane type.
///
/// Returns the category and whether the type was recognised. Unknown types
/// fall back to `Jet`.
pub fn classify(plane_type: &str) -> (AircraftCategory, bool) {
    let normalized = plane_type.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return (AircraftCategory::Jet, false);
    }

    if let Some((_, category)) = KNOWN_TYPES
        .iter()
        .find(|(name, _)| normalized.contains(name))
    {
        return (*category, true);
    }

    if normalized.contains("heli") {
        return (AircraftCategory::Helicopter, true);
    }
    if normalized.contains("turboprop")
        || (normalized.contains("turbo") && normalized.contains("prop"))
    {
        return (AircraftCategory::Turboprop, true);
    }
    if normalized.contains("prop") || normalized.contains("piston") {
        return (AircraftCategory::Prop, true);
    }
    if normalized.contains("jet") || normalized.contains("boeing") || normalized.contains("airbus")
    {
        return (AircraftCategory::Jet, true);
    }
    if ["b7", "a3", "a2"].iter().any(|p| normalized.starts_with(p)) {
        return (AircraftCategory::Jet, true);
    }

    (AircraftCategory::Jet, false)
}

/// Envelope that applies to a flight's plane type.
pub fn envelope_for(flight: &Flight) -> Envelope {
    classify(&flight.plane_type).0.envelope()
}

/// Non-fatal plausibility issues for one flight.
pub fn validate_flight(flight: &Flight) -> Vec<String> {
    let mut issues = Vec::new();
    let (category, matched) = classify(&flight.plane_type);
    let envelope = category.envelope();

    if !matched {
        issues.push(format!(
            "{}: unknown plane type '{}', defaulting to '{:?}' envelope",
            flight.acid, flight.plane_type, category
        ));
    }
    if !(envelope.min_speed_kt..=envelope.max_speed_kt).contains(&flight.speed_kt) {
        issues.push(format!(
            "{}: speed {}kt outside {}-{}kt",
            flight.acid, flight.speed_kt, envelope.min_speed_kt, envelope.max_speed_kt
        ));
    }
    if !(envelope.min_altitude_ft..=envelope.max_altitude_ft).contains(&flight.cruise_altitude_ft) {
        issues.push(format!(
            "{}: altitude {}ft outside {}-{}ft",
            flight.acid,
            flight.cruise_altitude_ft,
            envelope.min_altitude_ft,
            envelope.max_altitude_ft
        ));
    }
    if flight.is_cargo == Some(true) && flight.passengers.is_some_and(|p| p > 0) {
        issues.push(format!(
            "{}: cargo flight declares {} passengers",
            flight.acid,
            flight.passengers.unwrap_or_default()
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_types() {
        assert_eq!(classify("Boeing 737 MAX 8"), (AircraftCategory::Jet, true));
        assert_eq!(classify("Dash 8-400"), (AircraftCategory::Turboprop, true));
        assert_eq!(classify("Cessna piston"), (AircraftCategory::Prop, true));
        assert_eq!(classify("Bell helicopter"), (AircraftCategory::Helicopter, true));
        assert_eq!(classify("A320neo"), (AircraftCategory::Jet, true));
    }

    #[test]
    fn unknown_type_defaults_to_jet() {
        assert_eq!(classify("zeppelin"), (AircraftCategory::Jet, false));
        assert_eq!(classify(""), (AircraftCategory::Jet, false));
    }

    #[test]
    fn envelope_contains_bounds() {
        let env = AircraftCategory::Prop.envelope();
        assert!(env.contains(90, 1_000));
        assert!(env.contains(220, 18_000));
        assert!(!env.contains(221, 10_000));
        assert!(!env.contains(150, 20_000));
    }
}
