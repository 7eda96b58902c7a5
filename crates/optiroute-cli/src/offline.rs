//! Offline evaluation: datasets from disk, route files, engine construction.

use anyhow::{bail, Context, Result};
use optiroute_core::{
    default_bad_roads, polyline, ExclusionGeometryBuilder, ExclusionRules, LatLng,
    PivotRepository, RainfallField, RiskEngine, RiskRules, RoadConditionLayer,
    DEFAULT_OFFSETS_DEG,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Rainfall is assumed uniform around this point when given on the command line.
pub const CITY_CENTER: LatLng = LatLng::new(19.0760, 72.8777);

/// Flood pivots and bad-road points loaded once per invocation.
pub struct Datasets {
    pub pivots: Arc<PivotRepository>,
    pub roads: RoadConditionLayer,
    pub rules: RiskRules,
}

impl Datasets {
    /// Load `flood_pivots.csv` and `bad_roads.csv` from `data_dir`, falling
    /// back to the built-in sets. Fallbacks are reported on stderr.
    pub fn load(data_dir: &Path, rules: RiskRules) -> Self {
        let (pivots, err) = PivotRepository::load_or_default(data_dir.join("flood_pivots.csv"));
        if let Some(err) = err {
            eprintln!("Using built-in flood pivots: {}", err);
        }
        let (roads, err) =
            PivotRepository::load_or(data_dir.join("bad_roads.csv"), default_bad_roads());
        if let Some(err) = err {
            eprintln!("Using built-in bad roads: {}", err);
        }
        Self {
            pivots: Arc::new(pivots),
            roads: RoadConditionLayer::new(Arc::new(roads), rules.road_spread_km),
            rules,
        }
    }

    /// Engine for a uniform `rain_mm` accumulation; `None` means no weather data.
    pub fn engine(&self, rain_mm: Option<f64>) -> RiskEngine {
        let rainfall = match rain_mm {
            Some(mm) => RainfallField::around_center(CITY_CENTER, mm, &DEFAULT_OFFSETS_DEG),
            None => RainfallField::empty(),
        };
        RiskEngine::new(self.pivots.clone(), rainfall, self.rules.clone())
    }

    pub fn exclusion_builder(&self, engine: &RiskEngine) -> ExclusionGeometryBuilder {
        ExclusionGeometryBuilder::new(
            engine.surface().clone(),
            ExclusionRules::default(),
            self.rules.service_bbox,
        )
    }
}

/// Parse `"lat,lng"`.
pub fn parse_lat_lng(value: &str) -> Result<LatLng> {
    let (lat, lng) = value
        .split_once(',')
        .with_context(|| format!("expected 'lat,lng', got '{}'", value))?;
    let lat: f64 = lat.trim().parse().context("invalid latitude")?;
    let lng: f64 = lng.trim().parse().context("invalid longitude")?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        bail!("coordinate out of range: {}, {}", lat, lng);
    }
    Ok(LatLng::new(lat, lng))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RoutePoint {
    Object(LatLng),
    Pair([f64; 2]),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RouteFile {
    Points(Vec<RoutePoint>),
    Wrapped { coordinates: Vec<RoutePoint> },
}

/// Read a route from JSON (`[{lat,lng}]`, `[[lat,lng]]` or
/// `{"coordinates": [...]}`) or from an encoded polyline.
pub fn parse_route(contents: &str) -> Result<Vec<LatLng>> {
    let trimmed = contents.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let file: RouteFile = serde_json::from_str(trimmed).context("invalid route JSON")?;
        let points = match file {
            RouteFile::Points(points) | RouteFile::Wrapped { coordinates: points } => points,
        };
        return Ok(points
            .into_iter()
            .map(|point| match point {
                RoutePoint::Object(latlng) => latlng,
                RoutePoint::Pair([lat, lng]) => LatLng::new(lat, lng),
            })
            .collect());
    }
    polyline::decode(trimmed).context("invalid encoded polyline")
}

pub fn load_route(path: &Path) -> Result<Vec<LatLng>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_route(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinate_argument() {
        assert_eq!(parse_lat_lng("19.0056, 72.8417").unwrap(), LatLng::new(19.0056, 72.8417));
        assert!(parse_lat_lng("19.0").is_err());
        assert!(parse_lat_lng("95,72").is_err());
    }

    #[test]
    fn parses_route_formats() {
        let objects = parse_route(r#"[{"lat":19.0,"lng":72.8},{"lat":19.1,"lng":72.9}]"#).unwrap();
        let pairs = parse_route("[[19.0, 72.8], [19.1, 72.9]]").unwrap();
        let wrapped = parse_route(r#"{"coordinates":[[19.0,72.8],[19.1,72.9]]}"#).unwrap();
        assert_eq!(objects, pairs);
        assert_eq!(pairs, wrapped);
        let encoded = parse_route(&polyline::encode(&pairs)).unwrap();
        assert_eq!(encoded, pairs);
    }

    #[test]
    fn missing_data_dir_uses_builtin_sets() {
        let datasets = Datasets::load(Path::new("/nonexistent/optiroute"), RiskRules::default());
        assert_eq!(datasets.pivots.len(), 4);
        let dry = datasets.engine(None).point_risk(LatLng::new(19.0056, 72.8417));
        let wet = datasets.engine(Some(100.0)).point_risk(LatLng::new(19.0056, 72.8417));
        assert!((dry - 0.095).abs() < 1e-9);
        assert!((wet - 0.95).abs() < 1e-9);
    }
}
