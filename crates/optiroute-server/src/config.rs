//! Server configuration from environment.

use optiroute_core::RiskRules;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub ors_api_key: Option<String>,
    pub ors_base_url: String,
    /// Open-Meteo forecast endpoint; empty disables weather lookups.
    pub weather_url: String,
    pub directions_timeout_s: u64,
    pub geocode_timeout_s: u64,
    pub weather_timeout_s: u64,
    pub data_dir: PathBuf,
    pub spread_km: f64,
    pub route_sample_points: usize,
    pub heatmap_threshold: f64,
    pub cors_origins: Vec<String>,
    pub geocode_cache_ttl_s: u64,
    pub geocode_cache_max: usize,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = RiskRules::default();
        Self {
            host: env::var("OPTIROUTE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("OPTIROUTE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            ors_api_key: env::var("ORS_API_KEY")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            ors_base_url: env::var("ORS_BASE_URL")
                .unwrap_or_else(|_| "https://api.openrouteservice.org".to_string()),
            weather_url: env::var("WEATHER_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),
            directions_timeout_s: env::var("DIRECTIONS_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            geocode_timeout_s: env::var("GEOCODE_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            weather_timeout_s: env::var("WEATHER_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            data_dir: env::var("OPTIROUTE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            spread_km: env::var("SPREAD_KM")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|v: &f64| v.is_finite() && *v > 0.0)
                .unwrap_or(defaults.spread_km),
            route_sample_points: env::var("ROUTE_SAMPLE_POINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.route_sample_points),
            heatmap_threshold: parse_threshold(env::var("HEATMAP_THRESHOLD").ok())
                .unwrap_or(defaults.visibility_threshold),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            geocode_cache_ttl_s: env::var("GEOCODE_CACHE_TTL_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            geocode_cache_max: env::var("GEOCODE_CACHE_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(512),
            log_json: env::var("OPTIROUTE_LOG_JSON")
                .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Engine thresholds with the environment overrides applied.
    pub fn risk_rules(&self) -> RiskRules {
        RiskRules {
            spread_km: self.spread_km,
            route_sample_points: self.route_sample_points,
            visibility_threshold: self.heatmap_threshold,
            ..RiskRules::default()
        }
    }

    pub fn flood_pivots_path(&self) -> PathBuf {
        self.data_dir.join("flood_pivots.csv")
    }

    pub fn bad_roads_path(&self) -> PathBuf {
        self.data_dir.join("bad_roads.csv")
    }
}

/// Heatmap visibility threshold, accepted only within `[0, 1)`.
fn parse_threshold(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse().ok())
        .filter(|v: &f64| v.is_finite() && (0.0..1.0).contains(v))
}
