//! Risk engine: point, route and grid risk over one rainfall snapshot.
//!
//! An engine is built per request from the shared pivot repository and the
//! rainfall field fetched for that request. Every query on the same engine
//! reads the same snapshot, so scores produced for different routes and for
//! the heatmap are directly comparable.

use crate::models::{BoundingBox, HeatmapPoint, LatLng, RouteRisk};
use crate::modulator::EnvironmentalModulator;
use crate::pivots::PivotRepository;
use crate::preference::{DecayKernel, PreferenceSurface};
use crate::rainfall::RainfallField;
use crate::rules::RiskRules;
use crate::spatial::resample_by_arc_length;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const GRID_EDGE_TOLERANCE: f64 = 1e-9;
const MAX_GRID_COARSEN_ROUNDS: usize = 64;

/// Components of a single point evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRisk {
    pub lat: f64,
    pub lng: f64,
    pub preference: f64,
    pub rainfall_mm: f64,
    pub rainfall_factor: f64,
    pub risk: f64,
}

#[derive(Debug, Clone)]
pub struct RiskEngine {
    surface: PreferenceSurface,
    modulator: EnvironmentalModulator,
    rainfall: RainfallField,
    rules: RiskRules,
}

impl RiskEngine {
    /// Engine with the exponential kernel at `rules.spread_km`.
    pub fn new(pivots: Arc<PivotRepository>, rainfall: RainfallField, rules: RiskRules) -> Self {
        let surface = PreferenceSurface::exponential(pivots, rules.spread_km);
        Self::from_surface(surface, rainfall, rules)
    }

    /// Engine with a caller-supplied decay kernel.
    pub fn with_kernel(
        pivots: Arc<PivotRepository>,
        kernel: Arc<dyn DecayKernel>,
        rainfall: RainfallField,
        rules: RiskRules,
    ) -> Self {
        Self::from_surface(PreferenceSurface::new(pivots, kernel), rainfall, rules)
    }

    fn from_surface(surface: PreferenceSurface, rainfall: RainfallField, rules: RiskRules) -> Self {
        Self {
            surface,
            modulator: EnvironmentalModulator::new(rules.modulator),
            rainfall,
            rules,
        }
    }

    pub fn surface(&self) -> &PreferenceSurface {
        &self.surface
    }

    pub fn rainfall(&self) -> &RainfallField {
        &self.rainfall
    }

    pub fn rules(&self) -> &RiskRules {
        &self.rules
    }

    pub fn modulator(&self) -> &EnvironmentalModulator {
        &self.modulator
    }

    /// `preference(p) * modulate(sample_at(p))`, in [0, 1].
    pub fn point_risk(&self, point: LatLng) -> f64 {
        self.point_breakdown(point).risk
    }

    pub fn point_breakdown(&self, point: LatLng) -> PointRisk {
        let preference = self.surface.preference(point);
        let rainfall_mm = self.rainfall.sample_at(point);
        let rainfall_factor = self.modulator.modulate(rainfall_mm);
        PointRisk {
            lat: point.lat,
            lng: point.lng,
            preference,
            rainfall_mm,
            rainfall_factor,
            risk: (preference * rainfall_factor).clamp(0.0, 1.0),
        }
    }

    /// Reduce a geometry to the configured sample budget, evenly spaced by
    /// arc length.
    pub fn downsample(&self, geometry: &[LatLng]) -> Vec<LatLng> {
        resample_by_arc_length(geometry, self.rules.route_sample_points.max(1))
    }

    /// Mean point risk over the down-sampled geometry.
    ///
    /// An empty geometry yields a zero score flagged `insufficient_data`.
    pub fn route_risk(&self, route_id: impl Into<String>, geometry: &[LatLng]) -> RouteRisk {
        let route_id = route_id.into();
        let samples = self.downsample(geometry);
        if samples.is_empty() {
            return RouteRisk {
                route_id,
                risk_score: 0.0,
                insufficient_data: true,
                sampled_points: 0,
            };
        }

        let total: f64 = samples.iter().map(|point| self.point_risk(*point)).sum();
        RouteRisk {
            route_id,
            risk_score: (total / samples.len() as f64).clamp(0.0, 1.0),
            insufficient_data: false,
            sampled_points: samples.len(),
        }
    }

    /// Risk on a regular lattice over `bbox`, row-major by ascending
    /// latitude then longitude, keeping only points above the visibility
    /// threshold.
    pub fn grid_risk(&self, bbox: BoundingBox, spacing_deg: f64) -> Vec<HeatmapPoint> {
        if !spacing_deg.is_finite() || spacing_deg <= 0.0 {
            return Vec::new();
        }
        let bbox = bbox.normalized();
        let Some((rows, cols, spacing)) =
            resolve_lattice(&bbox, spacing_deg, self.rules.max_grid_points)
        else {
            return Vec::new();
        };

        // Never below 0, so every emitted point carries positive intensity.
        let threshold = self.rules.visibility_threshold.max(0.0);
        let mut points = Vec::new();
        for row in 0..rows {
            let lat = bbox.min_lat + row as f64 * spacing;
            for col in 0..cols {
                let lng = bbox.min_lng + col as f64 * spacing;
                let risk = self.point_risk(LatLng::new(lat, lng));
                if risk > threshold {
                    points.push(HeatmapPoint {
                        lat,
                        lng,
                        intensity: risk,
                    });
                }
            }
        }
        points
    }

    /// Grid over the configured heatmap area and spacing.
    pub fn default_heatmap(&self) -> Vec<HeatmapPoint> {
        self.grid_risk(self.rules.heatmap_bbox, self.rules.heatmap_spacing_deg)
    }
}

fn lattice_dims(bbox: &BoundingBox, spacing: f64) -> (usize, usize) {
    let rows = ((bbox.max_lat - bbox.min_lat) / spacing + GRID_EDGE_TOLERANCE).floor() as usize + 1;
    let cols = ((bbox.max_lng - bbox.min_lng) / spacing + GRID_EDGE_TOLERANCE).floor() as usize + 1;
    (rows, cols)
}

fn resolve_lattice(
    bbox: &BoundingBox,
    spacing_deg: f64,
    max_points: usize,
) -> Option<(usize, usize, f64)> {
    let max_points = max_points.max(1);
    let mut spacing = spacing_deg;
    for _ in 0..MAX_GRID_COARSEN_ROUNDS {
        let (rows, cols) = lattice_dims(bbox, spacing);
        let total = rows.saturating_mul(cols);
        if total <= max_points {
            return Some((rows, cols, spacing));
        }
        let scale = ((total as f64) / (max_points as f64)).sqrt().max(1.1);
        spacing *= scale;
        if !spacing.is_finite() {
            return None;
        }
    }
    None
}
