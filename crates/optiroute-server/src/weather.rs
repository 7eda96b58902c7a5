//! Rainfall snapshot from Open-Meteo.
//!
//! The snapshot is fetched once per request. Any failure degrades to an
//! empty field, which the engine reads as 0 mm everywhere.

use crate::config::Config;
use optiroute_core::{LatLng, RainfallField, DEFAULT_OFFSETS_DEG};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Point the accumulation is requested for.
pub const CITY_CENTER: LatLng = LatLng::new(19.0760, 72.8777);
const PAST_HOURS: usize = 24;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather lookups disabled")]
    Disabled,
    #[error("weather request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("weather provider HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    hourly: Option<OpenMeteoHourly>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
}

/// Current rainfall field, or an empty one when the provider is unavailable.
pub async fn fetch_rainfall(client: &Client, config: &Config) -> RainfallField {
    match fetch_accumulation(client, config).await {
        Ok(total_mm) => {
            tracing::debug!("Rainfall over last {}h: {:.1} mm", PAST_HOURS, total_mm);
            RainfallField::around_center(CITY_CENTER, total_mm, &DEFAULT_OFFSETS_DEG)
        }
        Err(WeatherError::Disabled) => RainfallField::empty(),
        Err(err) => {
            tracing::warn!("Weather unavailable, assuming dry conditions: {}", err);
            RainfallField::empty()
        }
    }
}

async fn fetch_accumulation(client: &Client, config: &Config) -> Result<f64, WeatherError> {
    let url = config.weather_url.trim();
    if url.is_empty() {
        return Err(WeatherError::Disabled);
    }

    let timeout = Duration::from_secs(config.weather_timeout_s.max(1));
    let response = client
        .get(url)
        .query(&[
            ("latitude", CITY_CENTER.lat.to_string()),
            ("longitude", CITY_CENTER.lng.to_string()),
            ("hourly", "precipitation".to_string()),
            ("past_hours", PAST_HOURS.to_string()),
            ("forecast_hours", "0".to_string()),
        ])
        .timeout(timeout)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(WeatherError::Status(response.status().as_u16()));
    }

    let payload: OpenMeteoResponse = response.json().await?;
    Ok(sum_precipitation(payload))
}

fn sum_precipitation(payload: OpenMeteoResponse) -> f64 {
    payload
        .hourly
        .map(|hourly| {
            hourly
                .precipitation
                .into_iter()
                .take(PAST_HOURS)
                .flatten()
                .filter(|mm| mm.is_finite() && *mm > 0.0)
                .sum()
        })
        .unwrap_or(0.0)
}
