pub mod compare;
pub mod engine;
pub mod exclusion;
pub mod models;
pub mod modulator;
pub mod pivots;
pub mod polyline;
pub mod preference;
pub mod rainfall;
pub mod roads;
pub mod rules;
pub mod spatial;

pub use compare::{
    assess, rank_by_risk, ComparisonWeights, RouteAssessment, RouteCandidate, RouteKind,
};
pub use engine::{PointRisk, RiskEngine};
pub use exclusion::{
    to_geojson, ExclusionGeometryBuilder, ExclusionOutcome, ExclusionRules, ExclusionTier,
    ParseTierError, TierProfile,
};
pub use models::{
    BoundingBox, ExclusionPolygon, HeatmapPoint, LatLng, Pivot, RainfallSample, RouteGeometry,
    RouteRisk,
};
pub use modulator::{EnvironmentalModulator, ModulatorConfig};
pub use pivots::{default_flood_pivots, LoadReport, PivotLoadError, PivotRepository};
pub use polyline::PolylineError;
pub use preference::{
    DecayKernel, ExponentialDecay, GaussianDecay, LinearDecay, PreferenceSurface,
    DEFAULT_SPREAD_KM,
};
pub use rainfall::{RainfallField, DEFAULT_OFFSETS_DEG};
pub use roads::{default_bad_roads, RoadConditionLayer};
pub use rules::RiskRules;
pub use spatial::{haversine_distance, haversine_km};
