//! REST API routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use optiroute_core::LatLng;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::planner::{
    self, HeatmapResponse, PlanError, PointRiskResponse, RoutesRequest, RoutesResponse,
};
use crate::state::AppState;

/// Error body shared by every endpoint: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        let status = match &err {
            PlanError::Invalid(_) => StatusCode::BAD_REQUEST,
            PlanError::Geocode(err) => err.status(),
            PlanError::Directions(err) => err.status(),
        };
        if status.is_server_error() {
            tracing::error!("Route request failed: {}", err);
        } else {
            tracing::info!("Route request rejected: {}", err);
        }
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/routes", post(plan_routes_handler))
        .route("/api/heatmap", get(heatmap_handler))
        .route("/api/risk/point", get(point_risk_handler))
}

async fn plan_routes_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RoutesRequest>,
) -> Result<Json<RoutesResponse>, ApiError> {
    let response = planner::plan_routes(state.as_ref(), payload).await?;
    Ok(Json(response))
}

async fn heatmap_handler(State(state): State<Arc<AppState>>) -> Json<HeatmapResponse> {
    Json(planner::current_heatmap(state.as_ref()).await)
}

#[derive(Debug, Deserialize)]
struct PointQuery {
    lat: Option<f64>,
    lng: Option<f64>,
}

async fn point_risk_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PointQuery>,
) -> Result<Json<PointRiskResponse>, ApiError> {
    let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
        return Err(ApiError::bad_request("lat and lng query parameters are required"));
    };
    let response = planner::point_risk(state.as_ref(), LatLng::new(lat, lng)).await?;
    Ok(Json(response))
}
