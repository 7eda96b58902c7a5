//! Bounded caches for provider lookups. The geocoder cache is keyed by the
//! lowercased geocoder query and bounded by `GEOCODE_CACHE_MAX` entries and
//! `GEOCODE_CACHE_TTL_S` seconds.

use dashmap::DashMap;
use optiroute_core::LatLng;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;
}

/// A resolved destination from the geocoder.
#[derive(Debug, Clone, Copy)]
pub struct GeocodeCacheEntry {
    pub fetched_at: Instant,
    pub location: LatLng,
}

impl CacheEntry for GeocodeCacheEntry {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

/// Drop entries older than `max_age`, then the oldest until at most
/// `max_entries` remain. Returns how many destinations were forgotten.
pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration) -> usize
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    let now = Instant::now();
    let before = cache.len();
    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();

    entries.retain(|(key, fetched_at)| {
        if now.duration_since(*fetched_at) > max_age {
            cache.remove(key);
            false
        } else {
            true
        }
    });

    if cache.len() > max_entries {
        entries.sort_by_key(|(_, fetched_at)| *fetched_at);
        for (key, _) in entries {
            if cache.len() <= max_entries {
                break;
            }
            cache.remove(&key);
        }
    }
    before.saturating_sub(cache.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(age: Duration) -> GeocodeCacheEntry {
        GeocodeCacheEntry {
            fetched_at: Instant::now() - age,
            location: LatLng::new(19.0, 72.8),
        }
    }

    #[test]
    fn prune_removes_expired_entries() {
        let cache = DashMap::new();
        cache.insert("fresh".to_string(), entry(Duration::from_secs(1)));
        cache.insert("stale".to_string(), entry(Duration::from_secs(120)));
        assert_eq!(prune_cache(&cache, 10, Duration::from_secs(60)), 1);
        assert!(cache.contains_key("fresh"));
        assert!(!cache.contains_key("stale"));
    }

    #[test]
    fn prune_evicts_oldest_over_capacity() {
        let cache = DashMap::new();
        cache.insert("a".to_string(), entry(Duration::from_secs(30)));
        cache.insert("b".to_string(), entry(Duration::from_secs(20)));
        cache.insert("c".to_string(), entry(Duration::from_secs(10)));
        assert_eq!(prune_cache(&cache, 2, Duration::from_secs(60)), 1);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains_key("a"));
    }

    #[test]
    fn prune_within_bounds_keeps_every_destination() {
        let cache = DashMap::new();
        cache.insert("dadar".to_string(), entry(Duration::from_secs(5)));
        cache.insert("bandra".to_string(), entry(Duration::from_secs(15)));
        assert_eq!(prune_cache(&cache, 2, Duration::from_secs(60)), 0);
        assert_eq!(cache.len(), 2);
    }
}
