//! Element-by-element parsing of raw flight batches.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aircraft::validate_flight;
use crate::conflict::PAIR_KEY_SEPARATOR;
use crate::models::Flight;

/// Flights that passed intake plus everything worth reporting about the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub flights: Vec<Flight>,
    pub issues: Vec<String>,
}

fn label(value: &Value, index: usize) -> String {
    value
        .get("ACID")
        .or_else(|| value.get("acid"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("flight #{index}"))
}

/// Parse a raw batch without failing on individual bad records.
///
/// Unparseable elements, duplicate ACIDs, ACIDs containing the pair-key
/// separator and non-positive speeds are dropped with an issue. Envelope problems are reported but the flight
/// is kept.
pub fn parse_batch(values: &[Value]) -> Batch {
    let mut batch = Batch::default();
    let mut seen = HashSet::new();

    for (index, value) in values.iter().enumerate() {
        if !value.is_object() {
            batch
                .issues
                .push(format!("flight #{index}: expected an object"));
            continue;
        }

        let flight: Flight = match serde_json::from_value(value.clone()) {
            Ok(flight) => flight,
            Err(err) => {
                batch
                    .issues
                    .push(format!("{}: invalid record: {err}", label(value, index)));
                continue;
            }
        };

        if flight.acid.trim().is_empty() {
            batch.issues.push(format!("flight #{index}: missing ACID"));
            continue;
        }
        if flight.acid.contains(PAIR_KEY_SEPARATOR) {
            batch.issues.push(format!(
                "{}: ACID must not contain '{PAIR_KEY_SEPARATOR}'",
                flight.acid
            ));
            continue;
        }
        if !seen.insert(flight.acid.clone()) {
            batch
                .issues
                .push(format!("{}: duplicate ACID, keeping the first record", flight.acid));
            continue;
        }
        if flight.speed_kt <= 0 {
            batch.issues.push(format!(
                "{}: speed must be positive, got {}kt",
                flight.acid, flight.speed_kt
            ));
            continue;
        }

        batch.issues.extend(validate_flight(&flight));
        batch.flights.push(flight);
    }

    if !batch.issues.is_empty() {
        tracing::debug!(
            accepted = batch.flights.len(),
            issues = batch.issues.len(),
            "batch intake reported issues"
        );
    }
    batch
}
