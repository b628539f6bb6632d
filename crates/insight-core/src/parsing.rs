//! Route string parsing and airport lookup.
//!
//! Waypoint tokens look like `49.97N/110.935W`. Routes are space-separated
//! tokens; a token may also be a known ICAO airport code.

use crate::error::{InsightError, Result};
use crate::models::{Flight, GeoPoint};

/// Known airport coordinates (ICAO code, lat, lon).
const AIRPORTS: &[(&str, f64, f64)] = &[
    ("CYYZ", 43.6777, -79.6248),
    ("CYVR", 49.1947, -123.1839),
    ("CYUL", 45.4706, -73.7408),
    ("CYOW", 45.3225, -75.6692),
    ("CYYC", 51.1225, -114.0139),
    ("CYEG", 53.3097, -113.5797),
    ("CYWG", 49.9100, -97.2399),
    ("CYQB", 46.7911, -71.3933),
    ("CYHZ", 44.8808, -63.5086),
    ("CYXE", 52.1708, -106.6997),
    ("CYQR", 50.4319, -104.6656),
    ("CYYJ", 48.6469, -123.4258),
    ("CYYT", 47.6186, -52.7519),
    ("CYQM", 46.1122, -64.6786),
    ("CYFC", 45.8689, -66.5372),
    ("CYSJ", 45.3161, -65.8903),
    ("CYQI", 43.8269, -66.0881),
    ("CYDF", 49.2108, -57.3914),
    ("CYQX", 48.9369, -54.5681),
    ("CYXY", 60.7096, -135.0674),
    ("CYZF", 62.4628, -114.4403),
    ("CYFB", 63.7561, -68.5558),
    ("CYTZ", 43.6275, -79.3962),
    ("CYOO", 43.9228, -78.8950),
    ("CYKF", 43.4608, -80.3786),
    ("CYXU", 43.0356, -81.1539),
    ("CYHM", 43.1736, -79.9350),
    ("CYAM", 46.4853, -84.5094),
    ("CYQA", 44.9747, -79.3033),
    ("CYTS", 48.5697, -81.3767),
    ("CYVO", 48.0533, -77.7828),
    ("CYMX", 45.6795, -74.0387),
    ("CYHU", 45.5175, -73.4169),
    ("CYQY", 46.1614, -60.0478),
    ("CYPR", 54.2861, -130.4447),
    ("CYXS", 53.8894, -122.6789),
    ("CYKA", 50.7022, -120.4444),
    ("CYLW", 49.9561, -119.3778),
    ("CYCD", 49.0522, -123.8700),
    ("CYXX", 49.0253, -122.3608),
    ("CYBL", 49.9508, -125.2708),
    ("CYXC", 49.6108, -115.7822),
    ("CYYF", 49.4631, -119.6022),
    ("CYQQ", 49.7108, -124.8867),
    ("CYZT", 50.6806, -127.3667),
];

/// Coordinates for an airport code, case-insensitive.
pub fn airport_coords(code: &str) -> Option<GeoPoint> {
    let code = code.trim();
    AIRPORTS
        .iter()
        .find(|(known, _, _)| known.eq_ignore_ascii_case(code))
        .map(|&(_, lat, lon)| GeoPoint::new(lat, lon))
}

/// Codes of every airport in the lookup table.
pub fn airport_codes() -> impl Iterator<Item = &'static str> {
    AIRPORTS.iter().map(|(code, _, _)| *code)
}

/// Parse a single `DD.ddN/DDD.ddW` token.
pub fn parse_waypoint(token: &str) -> Result<GeoPoint> {
    let invalid = || InsightError::InvalidWaypoint(token.to_string());
    let (lat_part, lon_part) = token.trim().split_once('/').ok_or_else(invalid)?;

    let lat = parse_coordinate(lat_part, ('N', 'S'), 90.0).ok_or_else(invalid)?;
    let lon = parse_coordinate(lon_part, ('E', 'W'), 180.0).ok_or_else(invalid)?;
    Ok(GeoPoint::new(lat, lon))
}

fn parse_coordinate(part: &str, hemispheres: (char, char), limit: f64) -> Option<f64> {
    let part = part.trim();
    let (split, hemisphere) = part.char_indices().last()?;
    let hemisphere = hemisphere.to_ascii_uppercase();
    let digits = &part[..split];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let magnitude: f64 = digits.parse().ok()?;
    if magnitude > limit {
        return None;
    }
    match hemisphere {
        h if h == hemispheres.0 => Some(magnitude),
        h if h == hemispheres.1 => Some(-magnitude),
        _ => None,
    }
}

/// Format a point as a waypoint token with four decimals.
pub fn format_waypoint(point: GeoPoint) -> String {
    let lat_dir = if point.lat < 0.0 { 'S' } else { 'N' };
    let lon_dir = if point.lon < 0.0 { 'W' } else { 'E' };
    format!(
        "{:.4}{}/{:.4}{}",
        point.lat.abs(),
        lat_dir,
        point.lon.abs(),
        lon_dir
    )
}

/// Format a polyline as a route string.
pub fn format_route(points: &[GeoPoint]) -> String {
    points
        .iter()
        .map(|p| format_waypoint(*p))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a route string, using airports as implicit endpoints when the route
/// alone has fewer than two points.
///
/// Returns a human-readable reason on failure.
pub fn parse_route(
    route: &str,
    departure_airport: Option<&str>,
    arrival_airport: Option<&str>,
) -> std::result::Result<Vec<GeoPoint>, String> {
    let mut points = Vec::new();
    for token in route.split_whitespace() {
        let point = match parse_waypoint(token) {
            Ok(point) => point,
            Err(err) => airport_coords(token).ok_or_else(|| err.to_string())?,
        };
        points.push(point);
    }

    if points.len() >= 2 {
        return Ok(points);
    }

    let departure = departure_airport.and_then(airport_coords);
    let arrival = arrival_airport.and_then(airport_coords);

    let expanded: Vec<GeoPoint> = departure
        .into_iter()
        .chain(points.iter().copied())
        .chain(arrival)
        .collect();

    if expanded.len() < 2 {
        return Err(if points.is_empty() {
            "route is empty and airports are unresolved".to_string()
        } else {
            "route must include at least two waypoints".to_string()
        });
    }
    Ok(expanded)
}

/// Effective route geometry of a flight.
pub fn route_points(flight: &Flight) -> Result<Vec<GeoPoint>> {
    parse_route(
        &flight.route,
        flight.departure_airport.as_deref(),
        flight.arrival_airport.as_deref(),
    )
    .map_err(|reason| InsightError::malformed_route(&flight.acid, reason))
}
