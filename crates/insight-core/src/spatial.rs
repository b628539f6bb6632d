//! Spatial math for separation checks and route geometry.
//!
//! Distances are in nautical miles, angles in radians unless noted.

use crate::models::GeoPoint;

pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Great-circle distance between two points (haversine).
pub fn great_circle_nm(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `a` to `b` (0 = north, clockwise).
pub fn bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    y.atan2(x).rem_euclid(2.0 * std::f64::consts::PI)
}

/// Destination point after travelling `distance_nm` along `bearing_rad`.
pub fn offset_by_bearing(origin: GeoPoint, distance_nm: f64, bearing_rad: f64) -> GeoPoint {
    if distance_nm.abs() <= f64::EPSILON {
        return origin;
    }

    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let angular_distance = distance_nm / EARTH_RADIUS_NM;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Linear interpolation in lat/lon space, `t` in `[0, 1]`.
pub fn interpolate(a: GeoPoint, b: GeoPoint, t: f64) -> GeoPoint {
    GeoPoint::new(a.lat + (b.lat - a.lat) * t, a.lon + (b.lon - a.lon) * t)
}

/// Per-segment great-circle lengths of a polyline.
pub fn segment_lengths_nm(points: &[GeoPoint]) -> Vec<f64> {
    points
        .windows(2)
        .map(|pair| great_circle_nm(pair[0], pair[1]))
        .collect()
}

/// Total great-circle length of a polyline.
pub fn path_length_nm(points: &[GeoPoint]) -> f64 {
    segment_lengths_nm(points).iter().sum()
}

/// Nautical miles spanned by one degree of latitude.
pub fn nm_per_deg_lat() -> f64 {
    EARTH_RADIUS_NM * std::f64::consts::PI / 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_longitude_at_equator_is_about_sixty_nm() {
        let dist = great_circle_nm(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert!(dist > 59.9 && dist < 60.5, "got {dist}");
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        let east = bearing(origin, GeoPoint::new(0.0, 1.0));
        let north = bearing(origin, GeoPoint::new(1.0, 0.0));
        assert!((east - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert!(north.abs() < 1e-9);
    }

    #[test]
    fn offset_round_trip_distance() {
        let origin = GeoPoint::new(49.0, -100.0);
        let dest = offset_by_bearing(origin, 20.0, 1.2);
        let dist = great_circle_nm(origin, dest);
        assert!((dist - 20.0).abs() < 1e-6, "got {dist}");
    }

    #[test]
    fn path_length_sums_segments() {
        let points = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(0.0, 2.0),
        ];
        let total = path_length_nm(&points);
        let direct = great_circle_nm(points[0], points[2]);
        assert!((total - direct).abs() < 1e-6);
    }
}
