//! Process-wide state: datasets loaded at startup plus the geocode cache.

use crate::cache::{prune_cache, GeocodeCacheEntry};
use crate::config::Config;
use dashmap::DashMap;
use optiroute_core::{
    default_bad_roads, ExclusionGeometryBuilder, ExclusionRules, PivotRepository, RainfallField,
    RiskEngine, RiskRules, RoadConditionLayer,
};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application state shared by every request.
///
/// Pivot datasets are immutable after startup. Per-request data (the
/// rainfall snapshot) never lives here; see [`AppState::engine`].
pub struct AppState {
    config: Config,
    pivots: Arc<PivotRepository>,
    roads: RoadConditionLayer,
    rules: RiskRules,
    exclusion_rules: ExclusionRules,
    http: Client,
    geocode_cache: DashMap<String, GeocodeCacheEntry>,
}

impl AppState {
    /// Load datasets from `config.data_dir`, falling back to the built-in
    /// sample sets when a file is missing or unreadable.
    pub fn new(config: Config) -> Self {
        let pivots = load_dataset(&config.flood_pivots_path(), "flood pivots", |path| {
            PivotRepository::load_or_default(path)
        });
        let roads = load_dataset(&config.bad_roads_path(), "bad roads", |path| {
            PivotRepository::load_or(path, default_bad_roads())
        });
        Self::with_datasets(config, pivots, roads)
    }

    pub fn with_datasets(config: Config, pivots: PivotRepository, roads: PivotRepository) -> Self {
        let rules = config.risk_rules();
        let roads = RoadConditionLayer::new(Arc::new(roads), rules.road_spread_km);
        Self {
            pivots: Arc::new(pivots),
            roads,
            rules,
            exclusion_rules: ExclusionRules::default(),
            http: Client::new(),
            geocode_cache: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn pivots(&self) -> &Arc<PivotRepository> {
        &self.pivots
    }

    pub fn roads(&self) -> &RoadConditionLayer {
        &self.roads
    }

    pub fn rules(&self) -> &RiskRules {
        &self.rules
    }

    /// Engine bound to one rainfall snapshot.
    pub fn engine(&self, rainfall: RainfallField) -> RiskEngine {
        RiskEngine::new(self.pivots.clone(), rainfall, self.rules.clone())
    }

    pub fn exclusion_builder(&self, engine: &RiskEngine) -> ExclusionGeometryBuilder {
        ExclusionGeometryBuilder::new(
            engine.surface().clone(),
            self.exclusion_rules.clone(),
            self.rules.service_bbox,
        )
    }

    pub fn cached_geocode(&self, key: &str) -> Option<GeocodeCacheEntry> {
        let ttl = Duration::from_secs(self.config.geocode_cache_ttl_s);
        let entry = self.geocode_cache.get(key).map(|entry| *entry.value())?;
        if entry.fetched_at.elapsed() <= ttl {
            Some(entry)
        } else {
            None
        }
    }

    pub fn store_geocode(&self, key: String, location: optiroute_core::LatLng) {
        self.geocode_cache.insert(
            key,
            GeocodeCacheEntry {
                fetched_at: Instant::now(),
                location,
            },
        );
        let evicted = prune_cache(
            &self.geocode_cache,
            self.config.geocode_cache_max,
            Duration::from_secs(self.config.geocode_cache_ttl_s),
        );
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.geocode_cache.len(), "Pruned geocode cache");
        }
    }
}

fn load_dataset<F>(path: &Path, label: &str, load: F) -> PivotRepository
where
    F: FnOnce(&Path) -> (PivotRepository, Option<optiroute_core::PivotLoadError>),
{
    let (repository, error) = load(path);
    if let Some(err) = error {
        tracing::warn!(
            "Using built-in {} ({} records): {}",
            label,
            repository.len(),
            err
        );
    }
    let report = repository.report();
    if report.clamped > 0 || report.skipped > 0 {
        tracing::warn!(
            "{}: {} records clamped, {} rows skipped",
            label,
            report.clamped,
            report.skipped
        );
    }
    tracing::info!("Loaded {} {}", repository.len(), label);
    repository
}

#[cfg(test)]
mod tests {
    use super::*;
    use optiroute_core::{default_flood_pivots, LatLng};

    fn state() -> AppState {
        let mut config = Config::from_env();
        config.geocode_cache_max = 2;
        config.geocode_cache_ttl_s = 3600;
        AppState::with_datasets(
            config,
            PivotRepository::new(default_flood_pivots()),
            PivotRepository::new(default_bad_roads()),
        )
    }

    #[test]
    fn geocode_cache_round_trip_and_capacity() {
        let state = state();
        state.store_geocode("bkc".to_string(), LatLng::new(19.06, 72.86));
        state.store_geocode("dadar".to_string(), LatLng::new(19.02, 72.84));
        state.store_geocode("powai".to_string(), LatLng::new(19.12, 72.90));
        assert!(state.cached_geocode("powai").is_some());
        assert_eq!(state.geocode_cache.len(), 2);
    }

    #[test]
    fn engines_share_the_pivot_repository() {
        let state = state();
        let engine = state.engine(RainfallField::empty());
        assert_eq!(engine.surface().pivots().len(), 4);
        assert!(std::ptr::eq(engine.surface().pivots(), state.pivots().as_ref()));
    }
}
