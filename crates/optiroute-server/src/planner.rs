//! Request orchestration: one rainfall snapshot, three candidate routes,
//! flood risk and road penalties, combined score and explanations.

use optiroute_core::{
    assess, rank_by_risk, to_geojson, ComparisonWeights, HeatmapPoint, LatLng, PointRisk,
    RiskEngine, RouteCandidate, RouteKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directions::{self, DirectionsError, RouteLeg};
use crate::geocode::{geocode_destination, GeocodeError};
use crate::state::AppState;
use crate::weather::fetch_rainfall;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    #[error(transparent)]
    Directions(#[from] DirectionsError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutesRequest {
    pub origin: LatLng,
    #[serde(default)]
    pub destination: Option<LatLng>,
    #[serde(default)]
    pub destination_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteOption {
    pub id: RouteKind,
    pub label: String,
    pub color: String,
    pub distance_m: f64,
    pub duration_s: f64,
    pub risk_score: f64,
    pub score: f64,
    pub explanation: String,
    pub coordinates: Vec<LatLng>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<RouteOption>,
    pub heatmap_points: Vec<HeatmapPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapResponse {
    pub heatmap_points: Vec<HeatmapPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointRiskResponse {
    #[serde(flatten)]
    pub risk: PointRisk,
    pub road_penalty: f64,
    pub evaluated_at: chrono::DateTime<chrono::Utc>,
}

pub async fn plan_routes(state: &AppState, request: RoutesRequest) -> Result<RoutesResponse, PlanError> {
    let origin = validate_origin(request.origin)?;
    let destination = match (request.destination, request.destination_text.as_deref()) {
        (Some(destination), _) => validate_coordinate("destination", destination)?,
        (None, Some(text)) if !text.trim().is_empty() => geocode_destination(state, text).await?,
        _ => {
            return Err(PlanError::Invalid(
                "Either destination or destination_text is required".to_string(),
            ))
        }
    };
    directions::check_endpoints(origin, destination)?;

    let rainfall = fetch_rainfall(state.http(), state.config()).await;
    let engine = state.engine(rainfall);
    let builder = state.exclusion_builder(&engine);

    let avoid: Vec<Option<serde_json::Value>> = RouteKind::ALL
        .iter()
        .map(|kind| {
            let tier = kind.exclusion_tier()?;
            let outcome = builder.build_with_report(tier, origin, destination);
            if outcome.shrunk > 0 || outcome.dropped > 0 {
                tracing::warn!(
                    "{} exclusion: {} polygons shrunk, {} dropped to keep endpoints routable",
                    tier,
                    outcome.shrunk,
                    outcome.dropped
                );
            }
            to_geojson(&outcome.polygons)
        })
        .collect();

    let client = state.http();
    let config = state.config();
    let (fastest, safer, safest) = tokio::try_join!(
        directions::fetch_route(client, config, origin, destination, avoid[0].as_ref()),
        directions::fetch_route(client, config, origin, destination, avoid[1].as_ref()),
        directions::fetch_route(client, config, origin, destination, avoid[2].as_ref()),
    )?;

    let routes = score_routes(state, &engine, [fastest, safer, safest]);
    Ok(RoutesResponse {
        routes,
        heatmap_points: engine.default_heatmap(),
    })
}

fn score_routes(state: &AppState, engine: &RiskEngine, legs: [RouteLeg; 3]) -> Vec<RouteOption> {
    let sample_points = engine.rules().route_sample_points;
    let candidates: Vec<RouteCandidate> = RouteKind::ALL
        .iter()
        .zip(legs.iter())
        .map(|(kind, leg)| {
            let risk = engine.route_risk(kind.id(), &leg.coordinates);
            RouteCandidate {
                kind: *kind,
                distance_m: leg.distance_m,
                duration_s: leg.duration_s,
                risk: risk.risk_score,
                road_penalty: state.roads().penalty_along(&leg.coordinates, sample_points),
                insufficient_data: risk.insufficient_data,
            }
        })
        .collect();

    let assessments = assess(&candidates, &ComparisonWeights::default());
    tracing::info!(
        "Scored routes (lowest risk first): {:?}; risks {:?}",
        rank_by_risk(&candidates),
        candidates.iter().map(|c| c.risk).collect::<Vec<_>>()
    );

    candidates
        .iter()
        .zip(assessments)
        .zip(legs)
        .map(|((candidate, assessment), leg)| RouteOption {
            id: candidate.kind,
            label: candidate.kind.label().to_string(),
            color: candidate.kind.color().to_string(),
            distance_m: candidate.distance_m,
            duration_s: candidate.duration_s,
            risk_score: candidate.risk,
            score: assessment.score,
            explanation: assessment.explanation,
            coordinates: leg.coordinates,
        })
        .collect()
}

pub async fn current_heatmap(state: &AppState) -> HeatmapResponse {
    let rainfall = fetch_rainfall(state.http(), state.config()).await;
    let engine = state.engine(rainfall);
    HeatmapResponse {
        heatmap_points: engine.default_heatmap(),
    }
}

pub async fn point_risk(state: &AppState, point: LatLng) -> Result<PointRiskResponse, PlanError> {
    let point = validate_coordinate("point", point)?;
    let rainfall = fetch_rainfall(state.http(), state.config()).await;
    let engine = state.engine(rainfall);
    Ok(PointRiskResponse {
        risk: engine.point_breakdown(point),
        road_penalty: state.roads().penalty_at(point),
        evaluated_at: chrono::Utc::now(),
    })
}

fn validate_origin(origin: LatLng) -> Result<LatLng, PlanError> {
    if origin.lat == 0.0 && origin.lng == 0.0 {
        return Err(PlanError::Invalid(
            "Invalid origin coordinates (0, 0). Please enable location access and try again."
                .to_string(),
        ));
    }
    validate_coordinate("origin", origin)
}

fn validate_coordinate(role: &str, point: LatLng) -> Result<LatLng, PlanError> {
    let in_range = point.lat.is_finite()
        && point.lng.is_finite()
        && (-90.0..=90.0).contains(&point.lat)
        && (-180.0..=180.0).contains(&point.lng);
    if !in_range {
        return Err(PlanError::Invalid(format!(
            "Invalid {} coordinates: {}, {}",
            role, point.lat, point.lng
        )));
    }
    Ok(point)
}
