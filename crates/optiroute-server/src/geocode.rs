//! Free-text destination lookup via the ORS geocoder, with an in-memory cache.

use crate::state::AppState;
use crate::weather::CITY_CENTER;
use axum::http::StatusCode;
use optiroute_core::{BoundingBox, LatLng};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Geocoded destinations outside this box are rejected.
pub const CITY_BOUNDS: BoundingBox = BoundingBox::new(18.90, 72.75, 19.30, 73.10);
const SEARCH_RADIUS_M: u32 = 30_000;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("ORS_API_KEY not configured")]
    MissingApiKey,
    #[error("Destination text is empty")]
    EmptyQuery,
    #[error("Destination not found in Mumbai")]
    NotFound,
    #[error("'{text}' geocoded to lat={lat:.2}, lng={lng:.2} which is outside Mumbai")]
    OutsideCity { text: String, lat: f64, lng: f64 },
    #[error("Geocoding failed: {0}")]
    Upstream(String),
    #[error("Geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl GeocodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            GeocodeError::EmptyQuery => StatusCode::BAD_REQUEST,
            GeocodeError::NotFound | GeocodeError::OutsideCity { .. } => StatusCode::NOT_FOUND,
            GeocodeError::MissingApiKey
            | GeocodeError::Upstream(_)
            | GeocodeError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: PointGeometry,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    /// `[lon, lat]`
    coordinates: Vec<f64>,
}

/// Query text sent to the geocoder; results are pinned to the city.
pub fn search_text(text: &str) -> String {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    if lower.contains("mumbai") || lower.contains("india") {
        trimmed.to_string()
    } else {
        format!("{}, Mumbai", trimmed)
    }
}

pub async fn geocode_destination(state: &AppState, text: &str) -> Result<LatLng, GeocodeError> {
    let config = state.config();
    let api_key = config
        .ors_api_key
        .as_deref()
        .ok_or(GeocodeError::MissingApiKey)?;
    if text.trim().is_empty() {
        return Err(GeocodeError::EmptyQuery);
    }

    let query = search_text(text);
    let cache_key = query.to_lowercase();
    if let Some(entry) = state.cached_geocode(&cache_key) {
        tracing::debug!("Geocode cache hit for '{}'", query);
        return Ok(entry.location);
    }

    let url = format!("{}/geocode/search", config.ors_base_url.trim_end_matches('/'));
    let timeout = Duration::from_secs(config.geocode_timeout_s.max(1));
    let response = state
        .http()
        .get(url)
        .query(&[
            ("api_key", api_key.to_string()),
            ("text", query.clone()),
            ("size", "1".to_string()),
            ("boundary.circle.lon", CITY_CENTER.lng.to_string()),
            ("boundary.circle.lat", CITY_CENTER.lat.to_string()),
            ("boundary.circle.radius", SEARCH_RADIUS_M.to_string()),
        ])
        .timeout(timeout)
        .send()
        .await?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GeocodeError::Upstream(body));
    }

    let collection: FeatureCollection = response.json().await?;
    let location = first_location(collection).ok_or(GeocodeError::NotFound)?;
    tracing::info!(
        "Geocoded '{}' (searched as '{}') -> {:.4}, {:.4}",
        text,
        query,
        location.lat,
        location.lng
    );

    if !CITY_BOUNDS.contains(location) {
        return Err(GeocodeError::OutsideCity {
            text: text.to_string(),
            lat: location.lat,
            lng: location.lng,
        });
    }

    state.store_geocode(cache_key, location);
    Ok(location)
}

fn first_location(collection: FeatureCollection) -> Option<LatLng> {
    let feature = collection.features.into_iter().next()?;
    match feature.geometry.coordinates.as_slice() {
        [lng, lat, ..] if lat.is_finite() && lng.is_finite() => Some(LatLng::new(*lat, *lng)),
        _ => None,
    }
}
