//! Zone determination.
//!
//! A (pickup, delivery) pair is classified by the first matching rule:
//!
//! 1. same city → A
//! 2. either side in the northeast/J&K prefix set → E
//! 3. both sides in the metro prefix set → C
//! 4. same state → B
//! 5. anything else → D
//!
//! When either pincode has no reference row, the same ordering is applied to
//! prefixes alone: equal 3-digit prefixes stand in for the same city and equal
//! 2-digit prefixes for the same state.
//!
//! Results are kept in a TTL cache. The cache only saves lookups; the answer
//! is the same with it disabled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::model::{Pincode, ZoneCode};
use crate::storage::Storage;

/// Resolves pincode pairs to zones, with caching.
#[derive(Clone)]
pub struct ZoneEngine {
    storage: Storage,
    config: Arc<EngineConfig>,
    cache: Arc<RwLock<HashMap<(String, String), (ZoneCode, Instant)>>>,
}

impl ZoneEngine {
    pub fn new(storage: Storage, config: Arc<EngineConfig>) -> Self {
        Self {
            storage,
            config,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Determine the zone for a pickup/delivery pair.
    ///
    /// Never fails: a reference-data error yields zone D, which is not cached.
    pub async fn determine_zone(&self, pickup: &str, delivery: &str) -> ZoneCode {
        let key = (pickup.to_string(), delivery.to_string());
        let ttl = self.config.zone_cache_ttl;

        if !ttl.is_zero() {
            let cache = self.cache.read().await;
            if let Some((zone, stored_at)) = cache.get(&key)
                && stored_at.elapsed() < ttl
            {
                debug!(pickup, delivery, zone = %zone, "Zone cache hit");
                return *zone;
            }
        }

        let zone = match self.lookup(pickup, delivery).await {
            Ok(zone) => zone,
            Err(e) => {
                warn!(pickup, delivery, error = %e, "Zone lookup failed, using zone D");
                return ZoneCode::D;
            }
        };

        if !ttl.is_zero() {
            let mut cache = self.cache.write().await;
            cache.retain(|_, (_, stored_at)| stored_at.elapsed() < ttl);
            cache.insert(key, (zone, Instant::now()));
        }

        zone
    }

    /// Drop every cached zone, e.g. after reference data changed.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        let dropped = cache.len();
        cache.clear();
        debug!(dropped, "Zone cache invalidated");
    }

    /// Number of cached pairs, including expired ones not yet evicted.
    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn lookup(&self, pickup: &str, delivery: &str) -> anyhow::Result<ZoneCode> {
        let pickup_row = self.storage.get_pincode(pickup).await?;
        let delivery_row = self.storage.get_pincode(delivery).await?;

        let zone = match (&pickup_row, &delivery_row) {
            (Some(from), Some(to)) => classify_records(&self.config, from, to),
            _ => classify_prefixes(&self.config, pickup, delivery),
        };

        Ok(zone)
    }
}

/// Classify a pair for which both reference rows exist.
pub fn classify_records(config: &EngineConfig, pickup: &Pincode, delivery: &Pincode) -> ZoneCode {
    let pickup_prefix = prefix(&pickup.pincode, 3);
    let delivery_prefix = prefix(&delivery.pincode, 3);

    if !pickup.city.trim().is_empty() && same_text(&pickup.city, &delivery.city) {
        ZoneCode::A
    } else if config.is_remote_prefix(pickup_prefix) || config.is_remote_prefix(delivery_prefix) {
        ZoneCode::E
    } else if config.is_metro_prefix(pickup_prefix) && config.is_metro_prefix(delivery_prefix) {
        ZoneCode::C
    } else if !pickup.state.trim().is_empty() && same_text(&pickup.state, &delivery.state) {
        ZoneCode::B
    } else {
        ZoneCode::D
    }
}

/// Classify a pair from the pincodes alone.
pub fn classify_prefixes(config: &EngineConfig, pickup: &str, delivery: &str) -> ZoneCode {
    let pickup_prefix = prefix(pickup, 3);
    let delivery_prefix = prefix(delivery, 3);

    if !pickup_prefix.is_empty() && pickup_prefix == delivery_prefix {
        ZoneCode::A
    } else if config.is_remote_prefix(pickup_prefix) || config.is_remote_prefix(delivery_prefix) {
        ZoneCode::E
    } else if config.is_metro_prefix(pickup_prefix) && config.is_metro_prefix(delivery_prefix) {
        ZoneCode::C
    } else if !prefix(pickup, 2).is_empty() && prefix(pickup, 2) == prefix(delivery, 2) {
        ZoneCode::B
    } else {
        ZoneCode::D
    }
}

/// Leading `len` characters, or "" when the pincode is shorter.
fn prefix(pincode: &str, len: usize) -> &str {
    pincode.get(..len).unwrap_or("")
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(code: &str, city: &str, state: &str) -> Pincode {
        Pincode {
            pincode: code.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            serviceable: true,
            cod_available: true,
        }
    }

    #[test]
    fn test_same_city_is_zone_a() {
        let config = EngineConfig::default();
        let zone = classify_records(
            &config,
            &record("110001", "New Delhi", "Delhi"),
            &record("110005", "New Delhi", "Delhi"),
        );
        assert_eq!(zone, ZoneCode::A);
    }

    #[test]
    fn test_same_city_beats_remote_prefix() {
        let config = EngineConfig::default();
        let zone = classify_records(
            &config,
            &record("781001", "Guwahati", "Assam"),
            &record("781005", "Guwahati", "Assam"),
        );
        assert_eq!(zone, ZoneCode::A);
    }

    #[test]
    fn test_northeast_is_zone_e() {
        let config = EngineConfig::default();
        let zone = classify_records(
            &config,
            &record("110001", "New Delhi", "Delhi"),
            &record("781001", "Guwahati", "Assam"),
        );
        assert_eq!(zone, ZoneCode::E);
    }

    #[test]
    fn test_metro_to_metro_beats_same_state() {
        let config = EngineConfig::default();
        // Mumbai and Pune: both metros, same state, different cities.
        let zone = classify_records(
            &config,
            &record("400001", "Mumbai", "Maharashtra"),
            &record("411001", "Pune", "Maharashtra"),
        );
        assert_eq!(zone, ZoneCode::C);
    }

    #[test]
    fn test_same_state_is_zone_b() {
        let config = EngineConfig::default();
        let zone = classify_records(
            &config,
            &record("400001", "Mumbai", "Maharashtra"),
            &record("440001", "Nagpur", "Maharashtra"),
        );
        assert_eq!(zone, ZoneCode::B);
    }

    #[test]
    fn test_rest_of_india_is_zone_d() {
        let config = EngineConfig::default();
        let zone = classify_records(
            &config,
            &record("302001", "Jaipur", "Rajasthan"),
            &record("682001", "Kochi", "Kerala"),
        );
        assert_eq!(zone, ZoneCode::D);
    }

    #[test]
    fn test_empty_city_does_not_match() {
        let config = EngineConfig::default();
        let zone = classify_records(
            &config,
            &record("302001", "", ""),
            &record("682001", "", ""),
        );
        assert_eq!(zone, ZoneCode::D);
    }

    #[test]
    fn test_prefix_rules() {
        let config = EngineConfig::default();
        assert_eq!(classify_prefixes(&config, "110001", "110005"), ZoneCode::A);
        assert_eq!(classify_prefixes(&config, "110001", "781001"), ZoneCode::E);
        assert_eq!(classify_prefixes(&config, "110001", "560001"), ZoneCode::C);
        assert_eq!(classify_prefixes(&config, "302001", "305001"), ZoneCode::B);
        assert_eq!(classify_prefixes(&config, "302001", "682001"), ZoneCode::D);
    }

    #[test]
    fn test_short_input_falls_through_to_d() {
        let config = EngineConfig::default();
        assert_eq!(classify_prefixes(&config, "1", "1"), ZoneCode::D);
    }

    async fn engine_with(ttl: Duration) -> (ZoneEngine, Storage) {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let config = EngineConfig {
            zone_cache_ttl: ttl,
            ..EngineConfig::default()
        };
        (ZoneEngine::new(storage.clone(), Arc::new(config)), storage)
    }

    #[tokio::test]
    async fn test_records_take_precedence_over_prefixes() {
        let (engine, storage) = engine_with(Duration::ZERO).await;

        // Different 3-digit prefixes but the same city on record.
        storage
            .upsert_pincode(&record("121001", "Faridabad", "Haryana"))
            .await
            .unwrap();
        storage
            .upsert_pincode(&record("121102", "Faridabad", "Haryana"))
            .await
            .unwrap();
        storage
            .upsert_pincode(&record("122001", "Gurugram", "Haryana"))
            .await
            .unwrap();

        assert_eq!(engine.determine_zone("121001", "121102").await, ZoneCode::A);
        assert_eq!(engine.determine_zone("121001", "122001").await, ZoneCode::B);
        // Unknown delivery pincode: prefix rules.
        assert_eq!(engine.determine_zone("121001", "121999").await, ZoneCode::A);
    }

    #[tokio::test]
    async fn test_cache_serves_until_invalidated() {
        let (engine, storage) = engine_with(Duration::from_secs(3600)).await;

        // Prefix rules: 302 vs 305 share "30" → B.
        assert_eq!(engine.determine_zone("302001", "305001").await, ZoneCode::B);
        assert_eq!(engine.cached_entries().await, 1);

        storage
            .upsert_pincode(&record("302001", "Jaipur", "Rajasthan"))
            .await
            .unwrap();
        storage
            .upsert_pincode(&record("305001", "Jaipur", "Rajasthan"))
            .await
            .unwrap();

        // Stale answer until invalidated.
        assert_eq!(engine.determine_zone("302001", "305001").await, ZoneCode::B);

        engine.invalidate().await;
        assert_eq!(engine.cached_entries().await, 0);
        assert_eq!(engine.determine_zone("302001", "305001").await, ZoneCode::A);
    }

    #[tokio::test]
    async fn test_disabled_cache_matches_cached_answer() {
        let (uncached, _) = engine_with(Duration::ZERO).await;
        let (cached, _) = engine_with(Duration::from_secs(60)).await;

        for (from, to) in [
            ("110001", "110005"),
            ("110001", "781001"),
            ("400001", "560001"),
            ("302001", "682001"),
        ] {
            assert_eq!(
                uncached.determine_zone(from, to).await,
                cached.determine_zone(from, to).await
            );
        }
        assert_eq!(uncached.cached_entries().await, 0);
        assert_eq!(cached.cached_entries().await, 4);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_zone_d_and_not_cached() {
        let (engine, storage) = engine_with(Duration::from_secs(3600)).await;
        storage.drop_table("pincodes").await.unwrap();

        // Same prefix would be zone A if the lookup succeeded.
        assert_eq!(engine.determine_zone("110001", "110005").await, ZoneCode::D);
        assert_eq!(engine.cached_entries().await, 0);
    }
}
