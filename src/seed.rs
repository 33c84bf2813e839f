//! Default reference data.
//!
//! Seeding only fills gaps: existing admin settings and insurance tiers are
//! never overwritten.

use tracing::info;

use crate::config::EngineConfig;
use crate::model::{InsuranceTier, ZoneCode};
use crate::storage::Storage;

/// Write `config`'s zone thresholds and the standard insurance tiers if absent.
pub async fn seed_defaults(storage: &Storage, config: &EngineConfig) -> anyhow::Result<()> {
    let mut thresholds_written = 0;
    for zone in ZoneCode::ALL {
        let key = zone.threshold_key();
        if storage.get_admin_setting(&key).await?.is_none() {
            storage
                .set_admin_setting(&key, &config.default_threshold(zone).to_string())
                .await?;
            thresholds_written += 1;
        }
    }

    let mut tiers_written = 0;
    if storage.count_insurance_tiers().await? == 0 {
        for tier in default_insurance_tiers() {
            storage.insert_insurance_tier(&tier).await?;
            tiers_written += 1;
        }
    }

    info!(thresholds_written, tiers_written, "Default reference data seeded");

    Ok(())
}

/// Basic, standard and premium cover.
pub fn default_insurance_tiers() -> Vec<InsuranceTier> {
    vec![
        InsuranceTier {
            id: 0,
            name: "Basic Cover".to_string(),
            coverage_percentage: 50.0,
            premium_percentage: 0.5,
            min_premium: 10.0,
            max_premium: Some(1000.0),
            risk_loading_percentage: 0.25,
            min_order_value: 0.0,
            max_order_value: Some(50_000.0),
            mandatory_above_value: None,
            mandatory_for_remote: false,
            mandatory_for_fragile: false,
            mandatory_for_electronics: false,
            is_active: true,
        },
        InsuranceTier {
            id: 0,
            name: "Standard Cover".to_string(),
            coverage_percentage: 100.0,
            premium_percentage: 1.5,
            min_premium: 25.0,
            max_premium: Some(2500.0),
            risk_loading_percentage: 0.5,
            min_order_value: 500.0,
            max_order_value: None,
            mandatory_above_value: Some(10_000.0),
            mandatory_for_remote: false,
            mandatory_for_fragile: false,
            mandatory_for_electronics: true,
            is_active: true,
        },
        InsuranceTier {
            id: 0,
            name: "Premium Cover".to_string(),
            coverage_percentage: 100.0,
            premium_percentage: 2.5,
            min_premium: 50.0,
            max_premium: Some(5000.0),
            risk_loading_percentage: 0.5,
            min_order_value: 2000.0,
            max_order_value: None,
            mandatory_above_value: None,
            mandatory_for_remote: true,
            mandatory_for_fragile: true,
            mandatory_for_electronics: false,
            is_active: true,
        },
    ]
}
