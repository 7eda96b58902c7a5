//! Tunable thresholds for the risk engine.

use crate::models::BoundingBox;
use crate::modulator::ModulatorConfig;
use crate::preference::DEFAULT_SPREAD_KM;
use serde::{Deserialize, Serialize};

/// Configuration for risk evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRules {
    /// Distance (km) over which a pivot's influence decays by a factor of e
    pub spread_km: f64,
    /// Fixed number of arc-length samples evaluated per route
    pub route_sample_points: usize,
    /// Heatmap points at or below this risk are not emitted
    pub visibility_threshold: f64,
    /// Area covered by the default heatmap
    pub heatmap_bbox: BoundingBox,
    /// Lattice spacing of the default heatmap in degrees
    pub heatmap_spacing_deg: f64,
    /// Upper bound on lattice points before the spacing is coarsened
    pub max_grid_points: usize,
    /// City limits; exclusion polygons are clipped to this box
    pub service_bbox: BoundingBox,
    /// Decay distance (km) for the bad-road layer
    pub road_spread_km: f64,
    pub modulator: ModulatorConfig,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self {
            spread_km: DEFAULT_SPREAD_KM,
            route_sample_points: 100,
            visibility_threshold: 0.05,
            // 35 x 35 lattice at 0.015° (~1.6 km) starting at 18.90 N, 72.75 E
            heatmap_bbox: BoundingBox::new(18.90, 72.75, 19.41, 73.26),
            heatmap_spacing_deg: 0.015,
            max_grid_points: 250_000,
            service_bbox: BoundingBox::new(18.90, 72.75, 19.30, 73.10),
            road_spread_km: 1.0,
            modulator: ModulatorConfig::default(),
        }
    }
}
