//! OpenRouteService directions client.

use crate::config::Config;
use axum::http::StatusCode;
use optiroute_core::polyline::{self, PolylineError};
use optiroute_core::{BoundingBox, LatLng};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const DRIVING_PROFILE: &str = "driving-car";
/// Metro area accepted as a routing endpoint.
pub const SERVICE_AREA: BoundingBox = BoundingBox::new(18.5, 72.3, 19.5, 73.5);
/// Larger separations almost always mean a bad geocode.
pub const MAX_ENDPOINT_SEPARATION_DEG: f64 = 0.7;

#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("ORS_API_KEY not configured")]
    MissingApiKey,
    #[error("{role} ({lat:.4}, {lng:.4}) is outside Mumbai area")]
    OutOfServiceArea { role: &'static str, lat: f64, lng: f64 },
    #[error("Route distance seems too large. Please check your destination and try again.")]
    EndpointsTooFar,
    #[error("Route is too long. Please choose destinations closer together in Mumbai.")]
    RouteTooLong,
    #[error("Route endpoint is not accessible by road. Try a different destination.")]
    NotRoutable,
    #[error("No route found from ORS API")]
    NoRoute,
    #[error("ORS API error: {0}")]
    Provider(String),
    #[error("Routing failed: {0}")]
    Upstream(String),
    #[error("Route geometry could not be decoded: {0}")]
    Geometry(#[from] PolylineError),
    #[error("Routing request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DirectionsError {
    pub fn status(&self) -> StatusCode {
        match self {
            DirectionsError::OutOfServiceArea { .. }
            | DirectionsError::EndpointsTooFar
            | DirectionsError::RouteTooLong
            | DirectionsError::NotRoutable
            | DirectionsError::NoRoute
            | DirectionsError::Provider(_) => StatusCode::BAD_REQUEST,
            DirectionsError::MissingApiKey
            | DirectionsError::Upstream(_)
            | DirectionsError::Geometry(_)
            | DirectionsError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// One route returned by the provider.
#[derive(Debug, Clone)]
pub struct RouteLeg {
    pub coordinates: Vec<LatLng>,
    pub distance_m: f64,
    pub duration_s: f64,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    summary: RouteSummary,
    #[serde(default)]
    geometry: String,
}

#[derive(Debug, Default, Deserialize)]
struct RouteSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

/// Reject endpoints the provider cannot sensibly route between.
pub fn check_endpoints(origin: LatLng, destination: LatLng) -> Result<(), DirectionsError> {
    if !SERVICE_AREA.contains(origin) {
        return Err(DirectionsError::OutOfServiceArea {
            role: "Origin",
            lat: origin.lat,
            lng: origin.lng,
        });
    }
    if !SERVICE_AREA.contains(destination) {
        return Err(DirectionsError::OutOfServiceArea {
            role: "Destination",
            lat: destination.lat,
            lng: destination.lng,
        });
    }
    let separation = (destination.lat - origin.lat).hypot(destination.lng - origin.lng);
    if separation > MAX_ENDPOINT_SEPARATION_DEG {
        return Err(DirectionsError::EndpointsTooFar);
    }
    Ok(())
}

/// Fetch a single driving route, optionally avoiding `avoid_polygons`
/// (GeoJSON Polygon or MultiPolygon).
pub async fn fetch_route(
    client: &Client,
    config: &Config,
    origin: LatLng,
    destination: LatLng,
    avoid_polygons: Option<&Value>,
) -> Result<RouteLeg, DirectionsError> {
    let api_key = config
        .ors_api_key
        .as_deref()
        .ok_or(DirectionsError::MissingApiKey)?;
    check_endpoints(origin, destination)?;

    let url = format!(
        "{}/v2/directions/{}",
        config.ors_base_url.trim_end_matches('/'),
        DRIVING_PROFILE
    );
    let mut body = json!({
        "coordinates": [
            [origin.lng, origin.lat],
            [destination.lng, destination.lat],
        ],
    });
    if let Some(polygons) = avoid_polygons {
        body["options"] = json!({ "avoid_polygons": polygons });
    }

    tracing::debug!(
        avoid = avoid_polygons.is_some(),
        "ORS request {:?} -> {:?}",
        origin,
        destination
    );

    let timeout = Duration::from_secs(config.directions_timeout_s.max(1));
    let response = client
        .post(url)
        .header("Authorization", api_key)
        .json(&body)
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(classify_failure(&text));
    }

    let payload: DirectionsResponse = serde_json::from_str(&text)
        .map_err(|err| DirectionsError::Upstream(format!("unreadable response: {}", err)))?;
    parse_route(payload)
}

fn parse_route(payload: DirectionsResponse) -> Result<RouteLeg, DirectionsError> {
    if let Some(error) = payload.error {
        return Err(DirectionsError::Provider(error_message(&error)));
    }
    let route = payload
        .routes
        .into_iter()
        .next()
        .ok_or(DirectionsError::NoRoute)?;
    if route.geometry.is_empty() {
        return Err(DirectionsError::Upstream(
            "Route has no geometry data".to_string(),
        ));
    }
    Ok(RouteLeg {
        coordinates: polyline::decode(&route.geometry)?,
        distance_m: route.summary.distance,
        duration_s: route.summary.duration,
    })
}

fn classify_failure(body: &str) -> DirectionsError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").map(error_message))
        .unwrap_or_default()
        .to_lowercase();
    if message.contains("routable point") {
        DirectionsError::NotRoutable
    } else if message.contains("exceed") && message.contains("distance") {
        DirectionsError::RouteTooLong
    } else {
        DirectionsError::Upstream(body.to_string())
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_outside_metro_are_rejected() {
        let bandra = LatLng::new(19.0596, 72.8295);
        let delhi = LatLng::new(28.6139, 77.2090);
        let err = check_endpoints(bandra, delhi).unwrap_err();
        assert!(matches!(err, DirectionsError::OutOfServiceArea { role: "Destination", .. }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(check_endpoints(bandra, LatLng::new(19.1136, 72.8697)).is_ok());
    }

    #[test]
    fn far_apart_endpoints_are_rejected() {
        let err = check_endpoints(LatLng::new(18.6, 72.4), LatLng::new(19.4, 73.4)).unwrap_err();
        assert!(matches!(err, DirectionsError::EndpointsTooFar));
    }

    #[test]
    fn provider_failures_are_classified() {
        let unroutable = r#"{"error":{"code":2010,"message":"Could not find routable point within a radius of 350.0 meters"}}"#;
        assert!(matches!(classify_failure(unroutable), DirectionsError::NotRoutable));
        let too_long = r#"{"error":{"code":2004,"message":"Request parameters exceed the server configuration limits. The approximated route distance must not be greater than 6000000.0 meters."}}"#;
        assert!(matches!(classify_failure(too_long), DirectionsError::RouteTooLong));
        let other = classify_failure("gateway timeout");
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn parses_first_route() {
        let payload: DirectionsResponse = serde_json::from_str(
            r#"{"routes":[{"summary":{"distance":1234.5,"duration":300.0},"geometry":"_p~iF~ps|U_ulLnnqC"}]}"#,
        )
        .unwrap();
        let leg = parse_route(payload).unwrap();
        assert_eq!(leg.coordinates.len(), 2);
        assert_eq!(leg.distance_m, 1234.5);
    }

    #[test]
    fn empty_routes_mean_no_route() {
        let payload: DirectionsResponse = serde_json::from_str(r#"{"routes":[]}"#).unwrap();
        assert!(matches!(parse_route(payload), Err(DirectionsError::NoRoute)));
        let payload: DirectionsResponse =
            serde_json::from_str(r#"{"error":"Invalid profile"}"#).unwrap();
        assert!(matches!(parse_route(payload), Err(DirectionsError::Provider(_))));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let mut config = Config::from_env();
        config.ors_api_key = None;
        let err = fetch_route(
            &Client::new(),
            &config,
            LatLng::new(19.0, 72.8),
            LatLng::new(19.1, 72.9),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DirectionsError::MissingApiKey));
    }
}
