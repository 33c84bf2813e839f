//! Shipping quote orchestration.
//!
//! [`ShippingEngine`] ties the components together:
//!
//! 1. serviceability check for both pincodes
//! 2. zone determination
//! 3. gross/dimensional/billable weight
//! 4. rate options for the zone and weight
//! 5. free-shipping policy
//! 6. insurance options
//!
//! [`ShippingEngine::try_calculate_shipping_charges`] reports failures as
//! [`QuoteError`]; [`ShippingEngine::calculate_shipping_charges`] turns any
//! failure into the zone D fallback quote so checkout always gets a price.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::QuoteError;
use crate::free_shipping::{apply_free_shipping, get_free_shipping_config};
use crate::insurance::calculate_insurance_options;
use crate::model::{
    LineItem, LocationDetails, QuoteOptions, RiskFlags, ShippingQuote, is_valid_pincode,
};
use crate::rates::get_shipping_options;
use crate::storage::Storage;
use crate::weight::calculate_total_weight;
use crate::zone::ZoneEngine;

/// The shipping zone and rate calculation engine.
#[derive(Clone)]
pub struct ShippingEngine {
    storage: Storage,
    config: Arc<EngineConfig>,
    zones: ZoneEngine,
}

impl ShippingEngine {
    pub fn new(storage: Storage, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        let zones = ZoneEngine::new(storage.clone(), Arc::clone(&config));

        Self {
            storage,
            config,
            zones,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn zones(&self) -> &ZoneEngine {
        &self.zones
    }

    /// Quote a basket, degrading to the fallback quote on any failure.
    #[instrument(skip(self, items, options), fields(item_count = items.len()))]
    pub async fn calculate_shipping_charges(
        &self,
        pickup_pincode: &str,
        delivery_pincode: &str,
        items: &[LineItem],
        order_value: f64,
        options: &QuoteOptions,
    ) -> ShippingQuote {
        match self
            .try_calculate_shipping_charges(
                pickup_pincode,
                delivery_pincode,
                items,
                order_value,
                options,
            )
            .await
        {
            Ok(quote) => quote,
            Err(e) => {
                warn!(
                    pickup = %pickup_pincode,
                    delivery = %delivery_pincode,
                    error = %e,
                    "Quote failed, returning fallback quote"
                );
                e.to_fallback_quote(&self.config)
            }
        }
    }

    /// Quote a basket, reporting why it could not be priced.
    ///
    /// The whole computation is bounded by `reference_timeout`.
    pub async fn try_calculate_shipping_charges(
        &self,
        pickup_pincode: &str,
        delivery_pincode: &str,
        items: &[LineItem],
        order_value: f64,
        options: &QuoteOptions,
    ) -> Result<ShippingQuote, QuoteError> {
        let timeout = self.config.reference_timeout;

        tokio::time::timeout(
            timeout,
            self.build_quote(
                pickup_pincode,
                delivery_pincode,
                items,
                order_value,
                options,
            ),
        )
        .await
        .map_err(|_| QuoteError::Timeout(timeout))?
    }

    async fn build_quote(
        &self,
        pickup_pincode: &str,
        delivery_pincode: &str,
        items: &[LineItem],
        order_value: f64,
        options: &QuoteOptions,
    ) -> Result<ShippingQuote, QuoteError> {
        for pincode in [pickup_pincode, delivery_pincode] {
            if !is_valid_pincode(pincode) {
                return Err(QuoteError::InvalidPincode(pincode.to_string()));
            }
        }

        let pickup = self.storage.get_pincode(pickup_pincode).await?;
        let delivery = self.storage.get_pincode(delivery_pincode).await?;

        let (pickup, delivery) = match (pickup, delivery) {
            (Some(p), Some(d)) if p.serviceable && d.serviceable => (p, d),
            _ => {
                return Err(QuoteError::NotServiceable {
                    pickup: pickup_pincode.to_string(),
                    delivery: delivery_pincode.to_string(),
                });
            }
        };

        let zone = self
            .zones
            .determine_zone(pickup_pincode, delivery_pincode)
            .await;

        let weights = calculate_total_weight(&self.config, items);
        let billable_weight = weights.billable_weight();

        let mut shipping_options =
            get_shipping_options(&self.storage, &self.config, zone, billable_weight, options)
                .await?;

        let free_shipping = get_free_shipping_config(&self.storage, &self.config, zone).await?;
        apply_free_shipping(&mut shipping_options, &free_shipping, order_value);

        let insurance = calculate_insurance_options(
            &self.storage,
            order_value,
            zone,
            RiskFlags::from(options),
        )
        .await?;

        info!(
            zone = %zone,
            billable_weight,
            option_count = shipping_options.len(),
            free_shipping = shipping_options.iter().any(|o| o.is_free_shipping),
            "Shipping quote calculated"
        );

        Ok(ShippingQuote {
            zone,
            zone_name: zone.name().to_string(),
            gross_weight: weights.gross_weight,
            dimensional_weight: weights.dimensional_weight,
            billable_weight,
            shipping_options,
            free_shipping_threshold: free_shipping.threshold,
            free_shipping_enabled: free_shipping.enabled,
            delivery_estimate: zone.delivery_estimate().to_string(),
            cod_available: delivery.cod_available,
            pickup_location: Some(LocationDetails::from(&pickup)),
            delivery_location: Some(LocationDetails::from(&delivery)),
            insurance_options: insurance.options,
            insurance_mandatory: insurance.is_mandatory,
            recommended_insurance: insurance.recommended,
            is_fallback: false,
        })
    }
}
