//! Applying resolution adjustments to flight records.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};
use crate::models::{Flight, FlightAction, GeoPoint};
use crate::parsing::{format_route, format_waypoint, parse_waypoint, route_points};
use crate::spatial::great_circle_nm;

/// A single change to one field of a flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "lowercase")]
pub enum Adjustment {
    Altitude { delta_ft: i32 },
    Speed { delta_kt: i32 },
    Departure { delta_min: i32 },
    Reroute { waypoint: GeoPoint },
}

impl Adjustment {
    pub fn summary(&self) -> String {
        match self {
            Self::Altitude { delta_ft } => format!("Change altitude by {delta_ft:+} ft"),
            Self::Speed { delta_kt } => format!("Change speed by {delta_kt:+} kt"),
            Self::Departure { delta_min } => format!("Shift departure by {delta_min:+} min"),
            Self::Reroute { waypoint } => {
                format!("Reroute via {}", format_waypoint(*waypoint))
            }
        }
    }

    /// Return a modified copy of `flight`.
    pub fn apply_to(&self, flight: &Flight) -> Result<Flight> {
        let mut revised = flight.clone();
        match self {
            Self::Altitude { delta_ft } => {
                revised.cruise_altitude_ft = flight.cruise_altitude_ft.saturating_add(*delta_ft);
            }
            Self::Speed { delta_kt } => {
                revised.speed_kt = flight.speed_kt.saturating_add(*delta_kt);
            }
            Self::Departure { delta_min } => {
                revised.departure_time = flight
                    .departure_time
                    .saturating_add(i64::from(*delta_min) * 60);
            }
            Self::Reroute { waypoint } => {
                let mut points = route_points(flight)?;
                insert_waypoint(&mut points, *waypoint);
                revised.route = format_route(&points);
            }
        }
        Ok(revised)
    }
}

/// Insert `waypoint` between the consecutive pair where it adds the least distance.
pub fn insert_waypoint(points: &mut Vec<GeoPoint>, waypoint: GeoPoint) {
    let best = points
        .windows(2)
        .enumerate()
        .map(|(idx, pair)| {
            let detour = great_circle_nm(pair[0], waypoint) + great_circle_nm(waypoint, pair[1])
                - great_circle_nm(pair[0], pair[1]);
            (idx, detour)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(idx, _)| idx + 1);

    match best {
        Some(position) => points.insert(position, waypoint),
        None => points.push(waypoint),
    }
}

impl FlightAction {
    pub fn from_adjustment(flight_id: impl Into<String>, adjustment: &Adjustment) -> Self {
        let mut action = Self {
            flight_id: flight_id.into(),
            ..Self::default()
        };
        match adjustment {
            Adjustment::Altitude { delta_ft } => action.delta_altitude_ft = Some(*delta_ft),
            Adjustment::Speed { delta_kt } => action.delta_speed_kt = Some(*delta_kt),
            Adjustment::Departure { delta_min } => action.delta_departure_min = Some(*delta_min),
            Adjustment::Reroute { waypoint } => {
                action.reroute_waypoint = Some(format_waypoint(*waypoint))
            }
        }
        action
    }

    /// Adjustments named by this action, in a fixed order.
    pub fn adjustments(&self) -> Result<Vec<Adjustment>> {
        let mut adjustments = Vec::new();
        if let Some(delta_ft) = self.delta_altitude_ft {
            adjustments.push(Adjustment::Altitude { delta_ft });
        }
        if let Some(delta_kt) = self.delta_speed_kt {
            adjustments.push(Adjustment::Speed { delta_kt });
        }
        if let Some(delta_min) = self.delta_departure_min {
            adjustments.push(Adjustment::Departure { delta_min });
        }
        if let Some(token) = self
            .reroute_waypoint
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            adjustments.push(Adjustment::Reroute {
                waypoint: parse_waypoint(token)?,
            });
        }
        Ok(adjustments)
    }
}

/// Apply every action to the batch.
///
/// All actions are validated before any flight is touched, so a failure
/// leaves the batch unchanged.
pub fn apply_actions(flights: Vec<Flight>, actions: &[FlightAction]) -> Result<Vec<Flight>> {
    let known: HashSet<&str> = flights.iter().map(|f| f.acid.as_str()).collect();
    let mut planned = Vec::with_capacity(actions.len());
    for action in actions {
        if !known.contains(action.flight_id.as_str()) {
            return Err(InsightError::UnknownFlight(action.flight_id.clone()));
        }
        planned.push((action.flight_id.as_str(), action.adjustments()?));
    }

    let mut revised = flights.clone();
    for (flight_id, adjustments) in planned {
        for flight in revised.iter_mut().filter(|f| f.acid == flight_id) {
            for adjustment in &adjustments {
                *flight = adjustment.apply_to(flight)?;
            }
        }
    }

    tracing::info!(actions = actions.len(), "applied flight actions");
    Ok(revised)
}
