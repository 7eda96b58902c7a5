//! Known poor road conditions, as a second weather-independent layer.
//!
//! Uses the same max-of-decayed-severity surface as the flood pivots, with
//! a tighter spread. The penalty is reported next to flood risk and feeds
//! the combined route score; it never modulates flood risk itself.

use crate::models::{LatLng, Pivot};
use crate::pivots::PivotRepository;
use crate::preference::PreferenceSurface;
use crate::spatial::resample_by_arc_length;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RoadConditionLayer {
    surface: PreferenceSurface,
}

impl RoadConditionLayer {
    pub fn new(segments: Arc<PivotRepository>, spread_km: f64) -> Self {
        Self {
            surface: PreferenceSurface::exponential(segments, spread_km),
        }
    }

    pub fn penalty_at(&self, point: LatLng) -> f64 {
        self.surface.preference(point)
    }

    /// Mean penalty over `sample_points` arc-length samples; 0 for an empty
    /// geometry.
    pub fn penalty_along(&self, geometry: &[LatLng], sample_points: usize) -> f64 {
        let samples = resample_by_arc_length(geometry, sample_points.max(1));
        if samples.is_empty() {
            return 0.0;
        }
        let total: f64 = samples.iter().map(|p| self.penalty_at(*p)).sum();
        (total / samples.len() as f64).clamp(0.0, 1.0)
    }
}

/// Sample bad-road points used when no dataset is present.
pub fn default_bad_roads() -> Vec<Pivot> {
    vec![
        Pivot::new("CST approach", 19.0757, 72.8772, 0.6),
        Pivot::new("Sion-Dharavi link", 19.0600, 72.8850, 0.7),
        Pivot::new("Worli backroads", 19.0400, 72.8400, 0.5),
    ]
}
