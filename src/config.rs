//! Engine configuration.
//!
//! All business constants the engine relies on (dimensional divisor, item
//! defaults, prefix sets, fallback rates) live in [`EngineConfig`], which is
//! built once at startup and shared by every component.

use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

use crate::model::{Dimensions, ZoneCode};

/// Weight breakpoints (kg) of the legacy rate table.
pub const LEGACY_BREAKPOINTS: [f64; 5] = [0.5, 1.0, 2.0, 5.0, 10.0];

/// Hardcoded rates used when a zone has no rate rows configured.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyRate {
    pub zone: ZoneCode,
    /// Cost for each entry of [`LEGACY_BREAKPOINTS`].
    pub rates: [f64; 5],
    /// Cost per started kg beyond the last breakpoint.
    pub additional_kg_rate: f64,
}

/// Three-digit prefixes of the large metro cities.
const METRO_PREFIXES: &[&str] = &[
    "110", // Delhi
    "400", // Mumbai
    "700", // Kolkata
    "600", // Chennai
    "560", // Bengaluru
    "500", // Hyderabad
    "411", // Pune
    "380", // Ahmedabad
];

/// Three-digit prefixes of the northeast states and J&K.
const REMOTE_PREFIXES: &[&str] = &[
    "180", "181", "182", "184", "185", "190", "191", "192", "193", "194", // J&K
    "737", // Sikkim
    "781", "782", "783", "784", "785", "786", "787", "788", // Assam
    "790", "791", "792", // Arunachal Pradesh
    "793", "794", // Meghalaya
    "795", // Manipur
    "796", // Mizoram
    "797", "798", // Nagaland
    "799", // Tripura
];

/// Configuration shared by every engine component.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cubic centimetres per kg of dimensional weight.
    pub dimensional_factor: f64,
    /// Weight (kg) assumed for an item without one.
    pub default_item_weight: f64,
    /// Dimensions assumed for an item without them.
    pub default_dimensions: Dimensions,
    /// Minimum packaging weight per unit (kg).
    pub min_packaging_weight: f64,
    /// Packaging weight as a fraction of product weight.
    pub packaging_ratio: f64,
    /// How long a resolved zone stays cached. Zero disables the cache.
    pub zone_cache_ttl: Duration,
    /// Upper bound for reference-data reads during one quote.
    pub reference_timeout: Duration,
    pub metro_prefixes: BTreeSet<String>,
    pub remote_prefixes: BTreeSet<String>,
    /// Free-shipping thresholds used when neither a rate row nor an admin
    /// setting provides one, indexed in [`ZoneCode::ALL`] order.
    pub default_thresholds: [f64; 5],
    pub legacy_rates: Vec<LegacyRate>,
    pub legacy_courier: String,
    pub legacy_cod_charges: f64,
    pub legacy_cod_percentage: f64,
    /// Billable weight of the fallback quote.
    pub fallback_weight: f64,
    /// Flat cost of the fallback quote.
    pub fallback_base_cost: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimensional_factor: 5000.0,
            default_item_weight: 0.25,
            default_dimensions: Dimensions {
                length: 20.0,
                width: 14.0,
                height: 2.0,
            },
            min_packaging_weight: 0.05,
            packaging_ratio: 0.1,
            zone_cache_ttl: Duration::from_secs(3600),
            reference_timeout: Duration::from_secs(5),
            metro_prefixes: METRO_PREFIXES.iter().map(|p| p.to_string()).collect(),
            remote_prefixes: REMOTE_PREFIXES.iter().map(|p| p.to_string()).collect(),
            default_thresholds: [499.0, 699.0, 799.0, 999.0, 1499.0],
            legacy_rates: vec![
                LegacyRate {
                    zone: ZoneCode::A,
                    rates: [40.0, 55.0, 75.0, 120.0, 200.0],
                    additional_kg_rate: 18.0,
                },
                LegacyRate {
                    zone: ZoneCode::B,
                    rates: [50.0, 65.0, 90.0, 145.0, 240.0],
                    additional_kg_rate: 22.0,
                },
                LegacyRate {
                    zone: ZoneCode::C,
                    rates: [60.0, 80.0, 110.0, 170.0, 280.0],
                    additional_kg_rate: 25.0,
                },
                LegacyRate {
                    zone: ZoneCode::D,
                    rates: [70.0, 95.0, 130.0, 200.0, 330.0],
                    additional_kg_rate: 30.0,
                },
                LegacyRate {
                    zone: ZoneCode::E,
                    rates: [90.0, 120.0, 165.0, 250.0, 400.0],
                    additional_kg_rate: 40.0,
                },
            ],
            legacy_courier: "Standard".to_string(),
            legacy_cod_charges: 50.0,
            legacy_cod_percentage: 2.0,
            fallback_weight: 0.5,
            fallback_base_cost: 70.0,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from defaults, overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ZONERATE_DIMENSIONAL_FACTOR`: cubic cm per kg (default 5000)
    /// - `ZONERATE_ZONE_CACHE_TTL_SECS`: zone cache TTL in seconds (default 3600)
    /// - `ZONERATE_REFERENCE_TIMEOUT_MS`: reference-data timeout (default 5000)
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(factor) = parse_env::<f64>("ZONERATE_DIMENSIONAL_FACTOR").filter(|f| *f > 0.0) {
            config.dimensional_factor = factor;
        }
        if let Some(secs) = parse_env::<u64>("ZONERATE_ZONE_CACHE_TTL_SECS") {
            config.zone_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_env::<u64>("ZONERATE_REFERENCE_TIMEOUT_MS").filter(|ms| *ms > 0) {
            config.reference_timeout = Duration::from_millis(ms);
        }

        config
    }

    /// Default free-shipping threshold for a zone.
    pub fn default_threshold(&self, zone: ZoneCode) -> f64 {
        let index = ZoneCode::ALL
            .iter()
            .position(|z| *z == zone)
            .unwrap_or(ZoneCode::ALL.len() - 1);
        self.default_thresholds[index]
    }

    /// Legacy rates for a zone, falling back to the zone D row.
    pub fn legacy_rate(&self, zone: ZoneCode) -> Option<&LegacyRate> {
        self.legacy_rates
            .iter()
            .find(|r| r.zone == zone)
            .or_else(|| self.legacy_rates.iter().find(|r| r.zone == ZoneCode::D))
    }

    pub fn is_metro_prefix(&self, prefix: &str) -> bool {
        self.metro_prefixes.contains(prefix)
    }

    pub fn is_remote_prefix(&self, prefix: &str) -> bool {
        self.remote_prefixes.contains(prefix)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_per_zone() {
        let config = EngineConfig::default();
        assert_eq!(config.default_threshold(ZoneCode::A), 499.0);
        assert_eq!(config.default_threshold(ZoneCode::D), 999.0);
        assert_eq!(config.default_threshold(ZoneCode::E), 1499.0);
    }

    #[test]
    fn test_prefix_sets() {
        let config = EngineConfig::default();
        assert!(config.is_metro_prefix("110"));
        assert!(config.is_metro_prefix("560"));
        assert!(!config.is_metro_prefix("781"));
        assert!(config.is_remote_prefix("781"));
        assert!(config.is_remote_prefix("190"));
        assert!(!config.is_remote_prefix("110"));
    }

    #[test]
    fn test_every_zone_has_legacy_rates() {
        let config = EngineConfig::default();
        for zone in ZoneCode::ALL {
            let legacy = config.legacy_rate(zone).unwrap();
            assert_eq!(legacy.zone, zone);
            assert!(legacy.rates.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
