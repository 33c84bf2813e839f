//! Free-shipping policy per zone.
//!
//! The most recently created rate row of a zone wins when it carries both
//! free-shipping columns. Otherwise the threshold comes from the
//! `zone_<x>_threshold` admin setting (or the configured default) and free
//! shipping is disabled.

use tracing::debug;

use crate::config::EngineConfig;
use crate::model::{FreeShippingConfig, RateOption, ZoneCode};
use crate::storage::Storage;

/// Resolve the free-shipping policy for a zone.
pub async fn get_free_shipping_config(
    storage: &Storage,
    config: &EngineConfig,
    zone: ZoneCode,
) -> anyhow::Result<FreeShippingConfig> {
    if let Some((Some(enabled), Some(threshold))) =
        storage.latest_free_shipping_config(zone).await?
    {
        debug!(zone = %zone, enabled, threshold, "Free shipping from rate row");
        return Ok(FreeShippingConfig { enabled, threshold });
    }

    let threshold = storage
        .admin_setting_f64(&zone.threshold_key(), config.default_threshold(zone))
        .await?;

    Ok(FreeShippingConfig {
        enabled: false,
        threshold,
    })
}

/// Zero the final cost of every option when the order qualifies.
///
/// `total_cost` is left untouched so callers can show the waived amount.
pub fn apply_free_shipping(
    options: &mut [RateOption],
    policy: &FreeShippingConfig,
    order_value: f64,
) {
    let qualifies = policy.enabled && order_value >= policy.threshold;

    for option in options.iter_mut() {
        option.is_free_shipping = qualifies;
        option.final_cost = if qualifies { 0.0 } else { option.total_cost };
    }
}
