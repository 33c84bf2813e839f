//! Insurance eligibility and premiums.
//!
//! Deliveries into zone E count as remote regardless of the caller's flag.

use crate::model::{InsuranceBundle, InsuranceOption, InsuranceTier, RiskFlags, ZoneCode, round2};
use crate::storage::Storage;

/// Load active tiers and compute the insurance bundle for an order.
pub async fn calculate_insurance_options(
    storage: &Storage,
    order_value: f64,
    zone: ZoneCode,
    flags: RiskFlags,
) -> anyhow::Result<InsuranceBundle> {
    let tiers = storage.active_insurance_tiers().await?;
    Ok(evaluate_tiers(&tiers, order_value, zone, flags))
}

/// Compute the insurance bundle from a list of tiers.
///
/// `recommended` is the cheapest eligible tier with full coverage; the first
/// one wins on equal premiums.
pub fn evaluate_tiers(
    tiers: &[InsuranceTier],
    order_value: f64,
    zone: ZoneCode,
    flags: RiskFlags,
) -> InsuranceBundle {
    let flags = RiskFlags {
        is_remote: flags.is_remote || zone == ZoneCode::E,
        ..flags
    };

    let options: Vec<InsuranceOption> = tiers
        .iter()
        .filter(|tier| is_eligible(tier, order_value))
        .map(|tier| InsuranceOption {
            tier_id: tier.id,
            name: tier.name.clone(),
            coverage_percentage: tier.coverage_percentage,
            coverage_amount: round2(order_value * tier.coverage_percentage / 100.0),
            premium: premium(tier, order_value, flags),
            is_mandatory: is_mandatory(tier, order_value, flags),
        })
        .collect();

    let recommended = options
        .iter()
        .filter(|o| o.coverage_percentage >= 100.0)
        .fold(None::<&InsuranceOption>, |best, o| match best {
            Some(b) if b.premium <= o.premium => Some(b),
            _ => Some(o),
        })
        .cloned();

    InsuranceBundle {
        is_mandatory: options.iter().any(|o| o.is_mandatory),
        options,
        recommended,
    }
}

fn is_eligible(tier: &InsuranceTier, order_value: f64) -> bool {
    tier.is_active
        && order_value >= tier.min_order_value
        && tier.max_order_value.is_none_or(|max| order_value <= max)
}

fn is_mandatory(tier: &InsuranceTier, order_value: f64, flags: RiskFlags) -> bool {
    tier.mandatory_above_value
        .is_some_and(|threshold| order_value >= threshold)
        || (tier.mandatory_for_remote && flags.is_remote)
        || (tier.mandatory_for_fragile && flags.has_fragile_items)
        || (tier.mandatory_for_electronics && flags.has_electronics)
}

/// Premium for a tier: base rate plus a loading per risk flag, clamped.
pub fn premium(tier: &InsuranceTier, order_value: f64, flags: RiskFlags) -> f64 {
    let risk_count = [flags.is_remote, flags.has_fragile_items, flags.has_electronics]
        .iter()
        .filter(|f| **f)
        .count() as f64;
    let rate = tier.premium_percentage + tier.risk_loading_percentage * risk_count;

    let mut amount = (order_value * rate / 100.0).max(tier.min_premium);
    if let Some(max) = tier.max_premium {
        amount = amount.min(max);
    }
    round2(amount)
}
