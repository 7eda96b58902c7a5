//! Blocking HTTP client for a running OptiRoute server.

use anyhow::{bail, Context, Result};
use optiroute_core::{HeatmapPoint, LatLng};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
struct RoutesRequest<'a> {
    origin: LatLng,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination: Option<LatLng>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination_text: Option<&'a str>,
}

/// One ranked option as returned by `/api/routes`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSummary {
    pub id: String,
    pub label: String,
    pub distance_m: f64,
    pub duration_s: f64,
    pub risk_score: f64,
    pub score: f64,
    pub explanation: String,
    #[serde(default)]
    pub coordinates: Vec<LatLng>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutesResponse {
    pub routes: Vec<RouteSummary>,
    #[serde(default)]
    pub heatmap_points: Vec<HeatmapPoint>,
}

pub struct RouteClient {
    client: Client,
    base_url: String,
}

impl RouteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Request the three ranked routes. `destination` takes precedence over
    /// `destination_text`.
    pub fn plan(
        &self,
        origin: LatLng,
        destination: Option<LatLng>,
        destination_text: Option<&str>,
    ) -> Result<RoutesResponse> {
        let body = RoutesRequest {
            origin,
            destination,
            destination_text,
        };
        let response = self
            .client
            .post(format!("{}/api/routes", self.base_url))
            .json(&body)
            .send()
            .context("failed to reach OptiRoute server")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<Value>()
                .ok()
                .and_then(|value| value.get("detail").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            bail!("server returned {}: {}", status.as_u16(), detail);
        }
        response.json().context("invalid routes response")
    }
}
