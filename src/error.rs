//! Error types for quote calculation.
//!
//! Quoting never fails outward: every [`QuoteError`] can be turned into a
//! conservative zone D quote with [`QuoteError::to_fallback_quote`].

use std::time::Duration;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::model::{RateOption, ShippingQuote, ZoneCode, round2};

/// Reasons a quote could not be computed from reference data.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Pickup or delivery pincode is unknown or not serviceable.
    #[error("Pincode not serviceable: pickup={pickup}, delivery={delivery}")]
    NotServiceable { pickup: String, delivery: String },

    /// Input is not a 6-digit pincode.
    #[error("Invalid pincode: {0}")]
    InvalidPincode(String),

    /// Reading reference data failed.
    #[error("Reference data error: {0}")]
    ReferenceData(#[from] anyhow::Error),

    /// Reference data did not answer in time.
    #[error("Reference data timed out after {0:?}")]
    Timeout(Duration),
}

impl QuoteError {
    /// Build the default quote returned in place of this error.
    ///
    /// The quote is priced as a single zone D parcel of `fallback_weight` at
    /// `fallback_base_cost`, with no free shipping, COD or insurance.
    pub fn to_fallback_quote(&self, config: &EngineConfig) -> ShippingQuote {
        let zone = ZoneCode::D;
        let base_cost = round2(config.fallback_base_cost);

        ShippingQuote {
            zone,
            zone_name: zone.name().to_string(),
            gross_weight: config.fallback_weight,
            dimensional_weight: 0.0,
            billable_weight: config.fallback_weight,
            shipping_options: vec![RateOption {
                courier: config.legacy_courier.clone(),
                slab_weight: config.fallback_weight,
                base_cost,
                additional_weight_charge: 0.0,
                cod_charge: 0.0,
                total_cost: base_cost,
                final_cost: base_cost,
                is_free_shipping: false,
            }],
            free_shipping_threshold: config.default_threshold(zone),
            free_shipping_enabled: false,
            delivery_estimate: zone.delivery_estimate().to_string(),
            cod_available: false,
            pickup_location: None,
            delivery_location: None,
            insurance_options: vec![],
            insurance_mandatory: false,
            recommended_insurance: None,
            is_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_quote_is_zone_d() {
        let config = EngineConfig::default();
        let err = QuoteError::NotServiceable {
            pickup: "110001".to_string(),
            delivery: "999999".to_string(),
        };

        let quote = err.to_fallback_quote(&config);

        assert_eq!(quote.zone, ZoneCode::D);
        assert!(quote.is_fallback);
        assert_eq!(quote.billable_weight, 0.5);
        assert_eq!(quote.shipping_options.len(), 1);
        assert_eq!(quote.shipping_options[0].final_cost, 70.0);
        assert_eq!(quote.free_shipping_threshold, 999.0);
        assert!(!quote.free_shipping_enabled);
    }

    #[test]
    fn test_error_messages() {
        let err = QuoteError::InvalidPincode("12ab".to_string());
        assert_eq!(err.to_string(), "Invalid pincode: 12ab");

        let err = QuoteError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
    }
}
