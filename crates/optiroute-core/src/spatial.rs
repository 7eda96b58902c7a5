//! Spatial math for risk queries and route sampling.

use crate::models::LatLng;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// Inputs are normalized first (latitude clamped, longitude wrapped), so
/// malformed coordinates never produce a NaN distance for finite input.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters, always `>= 0`
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = normalize_lat(lat1);
    let lat2 = normalize_lat(lat2);
    let lon1 = normalize_lon(lon1);
    let lon2 = normalize_lon(lon2);

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let distance = 2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt());
    if distance.is_finite() {
        distance.max(0.0)
    } else {
        0.0
    }
}

/// Haversine distance in kilometres between two points.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    haversine_distance(a.lat, a.lng, b.lat, b.lng) / 1000.0
}

/// Clamp a latitude into [-90, 90]. Non-finite values become 0.
pub fn normalize_lat(lat: f64) -> f64 {
    if !lat.is_finite() {
        return 0.0;
    }
    lat.clamp(-90.0, 90.0)
}

/// Wrap a longitude into [-180, 180). Non-finite values become 0.
pub fn normalize_lon(lon: f64) -> f64 {
    if !lon.is_finite() {
        return 0.0;
    }
    if (-180.0..180.0).contains(&lon) {
        return lon;
    }
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

// ==== Local degree/meter scaling ====

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert a north/south offset in meters to degrees latitude.
pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    let meters_per_deg = meters_per_deg_lat(ref_lat_deg).max(1e-9);
    meters / meters_per_deg
}

/// Convert an east/west offset in meters to degrees longitude.
/// Requires the reference latitude for proper scaling.
pub fn meters_to_lon(meters: f64, ref_lat_deg: f64) -> f64 {
    let meters_per_deg = meters_per_deg_lon(ref_lat_deg).max(1e-9);
    meters / meters_per_deg
}

/// Total length of a polyline in meters.
pub fn polyline_length_m(points: &[LatLng]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(pair[0].lat, pair[0].lng, pair[1].lat, pair[1].lng))
        .sum()
}

/// Resample a polyline into `count` points evenly spaced by arc length.
///
/// The first and last vertices are always included. Zero-length segments
/// contribute nothing, so duplicated consecutive vertices do not move any
/// sample. A polyline with zero total length collapses to its first point.
pub fn resample_by_arc_length(points: &[LatLng], count: usize) -> Vec<LatLng> {
    if points.is_empty() || count == 0 {
        return Vec::new();
    }

    let cumulative = cumulative_lengths(points);
    let total = cumulative.last().copied().unwrap_or(0.0);
    if total <= f64::EPSILON || points.len() == 1 {
        return vec![points[0]];
    }
    if count == 1 {
        return vec![points[0]];
    }

    let mut samples = Vec::with_capacity(count);
    let mut segment = 0usize;
    for i in 0..count {
        let target = total * i as f64 / (count - 1) as f64;
        while segment + 1 < points.len() - 1 && cumulative[segment + 1] < target {
            segment += 1;
        }
        let start = cumulative[segment];
        let span = cumulative[segment + 1] - start;
        let ratio = if span <= f64::EPSILON {
            0.0
        } else {
            ((target - start) / span).clamp(0.0, 1.0)
        };
        let a = points[segment];
        let b = points[segment + 1];
        samples.push(LatLng {
            lat: a.lat + (b.lat - a.lat) * ratio,
            lng: a.lng + (b.lng - a.lng) * ratio,
        });
    }
    samples
}

fn cumulative_lengths(points: &[LatLng]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;
    cumulative.push(0.0);
    for pair in points.windows(2) {
        total += haversine_distance(pair[0].lat, pair[0].lng, pair[1].lat, pair[1].lng);
        cumulative.push(total);
    }
    cumulative
}

/// Ray-casting point-in-polygon test on a `[LatLng]` ring.
pub fn ring_contains(ring: &[LatLng], point: LatLng) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = ring[i].lat;
        let xi = ring[i].lng;
        let yj = ring[j].lat;
        let xj = ring[j].lng;

        if ((yi > point.lat) != (yj > point.lat))
            && (point.lng < (xj - xi) * (point.lat - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64) -> LatLng {
        LatLng { lat, lng }
    }

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(19.0056, 72.8417, 19.0056, 72.8417);
        assert!(dist < 0.001);
    }

    #[test]
    fn haversine_wraps_longitude() {
        let a = haversine_distance(10.0, 179.9, 10.0, -179.9);
        let b = haversine_distance(10.0, 539.9, 10.0, -179.9);
        assert!((a - b).abs() < 1e-6);
        assert!(a < 25_000.0);
    }

    #[test]
    fn haversine_handles_nan() {
        let dist = haversine_distance(f64::NAN, 0.0, 0.0, 0.0);
        assert!(dist.is_finite());
    }

    #[test]
    fn resample_keeps_endpoints() {
        let line = vec![p(19.0, 72.8), p(19.0, 72.9), p(19.1, 72.9)];
        let samples = resample_by_arc_length(&line, 10);
        assert_eq!(samples.len(), 10);
        assert_eq!(samples[0], line[0]);
        let last = samples[9];
        assert!((last.lat - 19.1).abs() < 1e-9);
        assert!((last.lng - 72.9).abs() < 1e-9);
    }

    #[test]
    fn resample_ignores_duplicate_vertices() {
        let line = vec![p(19.0, 72.8), p(19.0, 72.85), p(19.0, 72.9)];
        let padded = vec![
            p(19.0, 72.8),
            p(19.0, 72.8),
            p(19.0, 72.85),
            p(19.0, 72.85),
            p(19.0, 72.85),
            p(19.0, 72.9),
        ];
        let a = resample_by_arc_length(&line, 17);
        let b = resample_by_arc_length(&padded, 17);
        for (x, y) in a.iter().zip(&b) {
            assert!((x.lat - y.lat).abs() < 1e-12);
            assert!((x.lng - y.lng).abs() < 1e-12);
        }
    }

    #[test]
    fn resample_degenerate_line() {
        let line = vec![p(19.0, 72.8), p(19.0, 72.8)];
        assert_eq!(resample_by_arc_length(&line, 100), vec![p(19.0, 72.8)]);
        assert!(resample_by_arc_length(&[], 100).is_empty());
    }

    #[test]
    fn ring_contains_square() {
        let ring = vec![
            p(19.0, 72.8),
            p(19.0, 72.9),
            p(19.1, 72.9),
            p(19.1, 72.8),
            p(19.0, 72.8),
        ];
        assert!(ring_contains(&ring, p(19.05, 72.85)));
        assert!(!ring_contains(&ring, p(19.2, 72.85)));
    }
}
