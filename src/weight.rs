//! Gross and dimensional weight of a basket.

use crate::config::EngineConfig;
use crate::model::{LineItem, WeightSummary};

/// Compute gross weight, dimensional weight and total volume for `items`.
///
/// Each unit carries packaging of `max(min_packaging_weight, weight * packaging_ratio)`.
/// Items without a weight use the configured default. Missing dimension sides
/// are filled one by one from the configured default dimensions.
pub fn calculate_total_weight(config: &EngineConfig, items: &[LineItem]) -> WeightSummary {
    let mut gross_weight = 0.0;
    let mut total_volume = 0.0;

    for item in items {
        let quantity = f64::from(item.quantity);
        let product_weight = item
            .weight
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(config.default_item_weight);
        let dimensions = item
            .dimensions
            .map_or(config.default_dimensions, |d| d.resolve(&config.default_dimensions));

        let packaging_weight = config
            .min_packaging_weight
            .max(product_weight * config.packaging_ratio);

        gross_weight += (product_weight + packaging_weight) * quantity;
        total_volume += dimensions.volume() * quantity;
    }

    WeightSummary {
        gross_weight: round_grams(gross_weight),
        dimensional_weight: round_grams(total_volume / config.dimensional_factor),
        total_volume,
    }
}

fn round_grams(kg: f64) -> f64 {
    (kg * 1000.0).round() / 1000.0
}
