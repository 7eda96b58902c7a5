use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use optiroute_core::{default_bad_roads, default_flood_pivots, PivotRepository};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, state::AppState};

fn test_config() -> Config {
    let mut config = Config::from_env();
    config.weather_url = String::new();
    config.ors_api_key = None;
    config.ors_base_url = "http://127.0.0.1:9".to_string();
    config
}

fn setup_app_with(config: Config, pivots: PivotRepository) -> Router {
    let state = Arc::new(AppState::with_datasets(
        config,
        pivots,
        PivotRepository::new(default_bad_roads()),
    ));
    api::app(state)
}

fn setup_app() -> Router {
    setup_app_with(test_config(), PivotRepository::new(default_flood_pivots()))
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post_routes(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/routes")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_reports_ok_with_request_id() {
    let response = setup_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn caller_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-123")
        .body(Body::empty())
        .unwrap();
    let response = setup_app().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-123");
}

#[tokio::test]
async fn heatmap_points_are_above_threshold() {
    let response = setup_app().oneshot(get("/api/heatmap")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let points = body["heatmap_points"].as_array().expect("points array");
    for point in points {
        let intensity = point["intensity"].as_f64().unwrap();
        assert!(intensity > 0.05 && intensity <= 1.0);
        assert!(point["lat"].is_f64() && point["lng"].is_f64());
    }
}

#[tokio::test]
async fn heatmap_survives_unreachable_weather_provider() {
    let mut config = test_config();
    config.weather_url = "http://127.0.0.1:9/v1/forecast".to_string();
    config.weather_timeout_s = 1;
    let app = setup_app_with(config, PivotRepository::new(default_flood_pivots()));
    let response = app.oneshot(get("/api/heatmap")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let points = body["heatmap_points"].as_array().expect("points array");
    assert!(!points.is_empty());
    for point in points {
        assert!(point["intensity"].as_f64().unwrap() <= 0.1 + 1e-9);
    }
}

#[tokio::test]
async fn empty_pivots_give_empty_heatmap() {
    let app = setup_app_with(test_config(), PivotRepository::empty());
    let body = read_json(app.oneshot(get("/api/heatmap")).await.unwrap()).await;
    assert_eq!(body, json!({ "heatmap_points": [] }));
}

#[tokio::test]
async fn point_risk_breakdown_when_dry() {
    let response = setup_app()
        .oneshot(get("/api/risk/point?lat=19.0056&lng=72.8417"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!((body["preference"].as_f64().unwrap() - 0.95).abs() < 1e-9);
    assert_eq!(body["rainfall_mm"].as_f64().unwrap(), 0.0);
    assert!((body["rainfall_factor"].as_f64().unwrap() - 0.1).abs() < 1e-12);
    assert!((body["risk"].as_f64().unwrap() - 0.095).abs() < 1e-9);
    assert!(body["evaluated_at"].is_string());
}

#[tokio::test]
async fn point_risk_validates_query() {
    let missing = setup_app().oneshot(get("/api/risk/point?lat=19.0")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(missing).await["detail"].is_string());

    let out_of_range = setup_app()
        .oneshot(get("/api/risk/point?lat=91&lng=72.8"))
        .await
        .unwrap();
    assert_eq!(out_of_range.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn routes_reject_null_island_origin() {
    let response = setup_app()
        .oneshot(post_routes(json!({
            "origin": {"lat": 0.0, "lng": 0.0},
            "destination": {"lat": 19.06, "lng": 72.86}
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(
        body["detail"],
        "Invalid origin coordinates (0, 0). Please enable location access and try again."
    );
}

#[tokio::test]
async fn routes_require_a_destination() {
    let response = setup_app()
        .oneshot(post_routes(json!({ "origin": {"lat": 19.05, "lng": 72.84} })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["detail"], "Either destination or destination_text is required");
}

#[tokio::test]
async fn routes_outside_service_area_are_rejected() {
    let mut config = test_config();
    config.ors_api_key = Some("test-key".to_string());
    let app = setup_app_with(config, PivotRepository::new(default_flood_pivots()));
    let response = app
        .oneshot(post_routes(json!({
            "origin": {"lat": 19.05, "lng": 72.84},
            "destination": {"lat": 28.61, "lng": 77.21}
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("outside Mumbai area"));
}

#[tokio::test]
async fn routes_without_api_key_fail_as_misconfigured() {
    let response = setup_app()
        .oneshot(post_routes(json!({
            "origin": {"lat": 19.05, "lng": 72.84},
            "destination": {"lat": 19.11, "lng": 72.87}
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["detail"], "ORS_API_KEY not configured");
}

#[tokio::test]
async fn destination_text_without_api_key_fails_before_lookup() {
    let response = setup_app()
        .oneshot(post_routes(json!({
            "origin": {"lat": 19.05, "lng": 72.84},
            "destination_text": "Bandra Kurla Complex"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
