//! Core data models for the flood-risk engine.

use crate::spatial::{normalize_lat, normalize_lon};
use serde::{Deserialize, Serialize};

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Clamp latitude and wrap longitude into their valid ranges.
    pub fn normalized(self) -> Self {
        Self {
            lat: normalize_lat(self.lat),
            lng: normalize_lon(self.lng),
        }
    }
}

/// Ordered route vertices as produced by the directions provider.
pub type RouteGeometry = Vec<LatLng>;

/// A known historical risk anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub lat: f64,
    pub lng: f64,
    /// Clamped to [0, 1] when loaded into a repository
    pub severity: f64,
    #[serde(default)]
    pub name: String,
}

impl Pivot {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64, severity: f64) -> Self {
        Self {
            lat,
            lng,
            severity,
            name: name.into(),
        }
    }

    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// 24-hour accumulated precipitation observed at a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainfallSample {
    pub lat: f64,
    pub lng: f64,
    pub accumulated_mm: f64,
}

impl RainfallSample {
    /// Negative or non-finite accumulations are stored as 0.
    pub fn new(lat: f64, lng: f64, accumulated_mm: f64) -> Self {
        let accumulated_mm = if accumulated_mm.is_finite() {
            accumulated_mm.max(0.0)
        } else {
            0.0
        };
        Self {
            lat,
            lng,
            accumulated_mm,
        }
    }

    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Aggregate risk for one candidate route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRisk {
    pub route_id: String,
    pub risk_score: f64,
    /// Set when the geometry had no points; `risk_score` is then 0 but
    /// must not be read as "safe".
    pub insufficient_data: bool,
    pub sampled_points: usize,
}

/// A visible heatmap lattice point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub lat: f64,
    pub lng: f64,
    pub intensity: f64,
}

/// Axis-aligned lat/lng rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    /// Swap inverted corners and clamp into valid coordinate ranges.
    pub fn normalized(self) -> Self {
        let (min_lat, max_lat) = ordered(normalize_lat(self.min_lat), normalize_lat(self.max_lat));
        let (min_lng, max_lng) = ordered(clamp_lng(self.min_lng), clamp_lng(self.max_lng));
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }

    /// Intersection of two boxes, or `None` when they do not overlap with
    /// positive area.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let clipped = BoundingBox {
            min_lat: self.min_lat.max(other.min_lat),
            min_lng: self.min_lng.max(other.min_lng),
            max_lat: self.max_lat.min(other.max_lat),
            max_lng: self.max_lng.min(other.max_lng),
        };
        if clipped.min_lat < clipped.max_lat && clipped.min_lng < clipped.max_lng {
            Some(clipped)
        } else {
            None
        }
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Closed ring, counter-clockwise from the south-west corner.
    pub fn ring(&self) -> Vec<LatLng> {
        vec![
            LatLng::new(self.min_lat, self.min_lng),
            LatLng::new(self.min_lat, self.max_lng),
            LatLng::new(self.max_lat, self.max_lng),
            LatLng::new(self.max_lat, self.min_lng),
            LatLng::new(self.min_lat, self.min_lng),
        ]
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// Bounding boxes keep the antimeridian edge instead of wrapping it.
fn clamp_lng(lng: f64) -> f64 {
    if !lng.is_finite() {
        return 0.0;
    }
    lng.clamp(-180.0, 180.0)
}

/// Advisory avoidance polygon handed to the directions provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionPolygon {
    /// Name of the pivot the polygon was built around
    pub pivot_name: String,
    /// Closed ring (first == last)
    pub ring: Vec<LatLng>,
}

impl ExclusionPolygon {
    pub fn contains(&self, point: LatLng) -> bool {
        crate::spatial::ring_contains(&self.ring, point)
    }

    /// Ring as GeoJSON `[lng, lat]` positions.
    pub fn geojson_ring(&self) -> Vec<[f64; 2]> {
        self.ring.iter().map(|p| [p.lng, p.lat]).collect()
    }
}
