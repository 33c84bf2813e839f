//! Data models for Zonerate.
//!
//! Two families of types live here:
//!
//! - **Reference data**: pincodes, weight slabs, zone rate rows and insurance
//!   tiers. These are provisioned by back-office tooling and only read by the
//!   engine.
//! - **Quote data**: the line items a caller sends in and the
//!   [`ShippingQuote`] the engine hands back.
//!
//! Quote request/response types serialize with camelCase field names, which is
//! the wire shape checkout clients consume.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Shipping-distance category between two pincodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZoneCode {
    /// Same city.
    A,
    /// Same state or region.
    B,
    /// Metro to metro.
    C,
    /// Rest of India.
    D,
    /// Remote, northeast or J&K.
    E,
}

impl ZoneCode {
    /// All zones in order.
    pub const ALL: [ZoneCode; 5] = [ZoneCode::A, ZoneCode::B, ZoneCode::C, ZoneCode::D, ZoneCode::E];

    /// Single-letter code as stored in the `shipping_zones` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneCode::A => "A",
            ZoneCode::B => "B",
            ZoneCode::C => "C",
            ZoneCode::D => "D",
            ZoneCode::E => "E",
        }
    }

    /// Human-readable zone name.
    pub fn name(&self) -> &'static str {
        match self {
            ZoneCode::A => "Within City",
            ZoneCode::B => "Within State",
            ZoneCode::C => "Metro to Metro",
            ZoneCode::D => "Rest of India",
            ZoneCode::E => "North East & J&K",
        }
    }

    /// Expected transit time for parcels in this zone.
    pub fn delivery_estimate(&self) -> &'static str {
        match self {
            ZoneCode::A => "1-2 business days",
            ZoneCode::B => "2-3 business days",
            ZoneCode::C => "2-4 business days",
            ZoneCode::D => "4-6 business days",
            ZoneCode::E => "6-9 business days",
        }
    }

    /// Admin-settings key holding this zone's default free-shipping threshold.
    pub fn threshold_key(&self) -> String {
        format!("zone_{}_threshold", self.as_str().to_lowercase())
    }
}

impl fmt::Display for ZoneCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(ZoneCode::A),
            "B" => Ok(ZoneCode::B),
            "C" => Ok(ZoneCode::C),
            "D" => Ok(ZoneCode::D),
            "E" => Ok(ZoneCode::E),
            other => Err(format!("unknown zone code '{other}'")),
        }
    }
}

/// Name of a zone, for collaborators that only hold the code.
pub fn zone_name(zone: ZoneCode) -> &'static str {
    zone.name()
}

/// A serviceability row for a single postal code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pincode {
    /// 6-digit postal code.
    pub pincode: String,
    pub city: String,
    pub state: String,
    /// Whether parcels can be picked up from / delivered to this pincode.
    pub serviceable: bool,
    pub cod_available: bool,
}

/// A rate tier: the weight included in the forward rate, and who carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSlab {
    pub id: i64,
    /// Included weight in kg. Always positive.
    pub base_weight: f64,
    pub courier_name: String,
}

/// A rate row for one (zone, weight slab) combination, joined with its slab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRate {
    pub id: i64,
    pub zone: ZoneCode,
    pub weight_slab_id: i64,
    pub base_weight: f64,
    pub courier_name: String,
    /// Forward cost covering `base_weight`.
    pub fwd_rate: f64,
    /// Cost per additional `base_weight` unit.
    pub aw_rate: f64,
    /// Fixed COD fee.
    pub cod_charges: f64,
    /// COD fee as a percentage of the collect amount.
    pub cod_percentage: f64,
    pub free_shipping_enabled: Option<bool>,
    pub free_shipping_threshold: Option<f64>,
}

/// Values needed to insert a new rate row.
#[derive(Debug, Clone, Default)]
pub struct NewZoneRate {
    pub fwd_rate: f64,
    pub aw_rate: f64,
    pub cod_charges: f64,
    pub cod_percentage: f64,
    pub free_shipping_enabled: Option<bool>,
    pub free_shipping_threshold: Option<f64>,
}

/// An insurance tier definition.
///
/// Premium rate is `premium_percentage` plus `risk_loading_percentage` for each
/// risk flag present, clamped between `min_premium` and `max_premium`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceTier {
    pub id: i64,
    pub name: String,
    /// Share of the order value covered, in (0, 100].
    pub coverage_percentage: f64,
    pub premium_percentage: f64,
    pub min_premium: f64,
    pub max_premium: Option<f64>,
    pub risk_loading_percentage: f64,
    pub min_order_value: f64,
    pub max_order_value: Option<f64>,
    /// Tier becomes mandatory at or above this order value.
    pub mandatory_above_value: Option<f64>,
    pub mandatory_for_remote: bool,
    pub mandatory_for_fragile: bool,
    pub mandatory_for_electronics: bool,
    pub is_active: bool,
}

/// Package dimensions in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }
}

/// Dimensions as supplied by a caller. Any side may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDimensions {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl ItemDimensions {
    /// Fill missing or non-positive sides from `defaults`, side by side.
    pub fn resolve(&self, defaults: &Dimensions) -> Dimensions {
        let side = |value: Option<f64>, default: f64| {
            value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(default)
        };

        Dimensions {
            length: side(self.length, defaults.length),
            width: side(self.width, defaults.width),
            height: side(self.height, defaults.height),
        }
    }
}

impl From<Dimensions> for ItemDimensions {
    fn from(d: Dimensions) -> Self {
        Self {
            length: Some(d.length),
            width: Some(d.width),
            height: Some(d.height),
        }
    }
}

/// A product line in the basket being shipped.
///
/// Missing weight, dimensions or quantity are filled with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product weight in kg.
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub dimensions: Option<ItemDimensions>,
    #[serde(default = "default_quantity", deserialize_with = "quantity_or_default")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

fn quantity_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_else(default_quantity))
}

/// Payment and risk context for a quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteOptions {
    pub cod: bool,
    pub collect_amount: f64,
    pub is_remote: bool,
    pub has_fragile_items: bool,
    pub has_electronics: bool,
}

/// Risk flags that drive insurance eligibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskFlags {
    pub is_remote: bool,
    pub has_fragile_items: bool,
    pub has_electronics: bool,
}

impl From<&QuoteOptions> for RiskFlags {
    fn from(options: &QuoteOptions) -> Self {
        Self {
            is_remote: options.is_remote,
            has_fragile_items: options.has_fragile_items,
            has_electronics: options.has_electronics,
        }
    }
}

/// Aggregate weight of a basket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSummary {
    pub gross_weight: f64,
    pub dimensional_weight: f64,
    /// Cubic centimetres.
    pub total_volume: f64,
}

impl WeightSummary {
    /// The weight actually charged: the larger of gross and dimensional weight.
    pub fn billable_weight(&self) -> f64 {
        round2(self.gross_weight.max(self.dimensional_weight))
    }
}

/// One priced carrier option.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateOption {
    pub courier: String,
    /// Included weight of the slab this option was priced from.
    pub slab_weight: f64,
    pub base_cost: f64,
    pub additional_weight_charge: f64,
    pub cod_charge: f64,
    pub total_cost: f64,
    /// What the customer pays after free-shipping policy.
    pub final_cost: f64,
    pub is_free_shipping: bool,
}

/// Resolved free-shipping policy for a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreeShippingConfig {
    pub enabled: bool,
    pub threshold: f64,
}

/// A priced insurance option.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceOption {
    pub tier_id: i64,
    pub name: String,
    pub coverage_percentage: f64,
    pub coverage_amount: f64,
    pub premium: f64,
    pub is_mandatory: bool,
}

/// All insurance options for an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceBundle {
    pub is_mandatory: bool,
    pub options: Vec<InsuranceOption>,
    /// Cheapest full-coverage option, if one is eligible.
    pub recommended: Option<InsuranceOption>,
}

/// City/state of a pickup or delivery point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationDetails {
    pub pincode: String,
    pub city: String,
    pub state: String,
}

impl From<&Pincode> for LocationDetails {
    fn from(p: &Pincode) -> Self {
        Self {
            pincode: p.pincode.clone(),
            city: p.city.clone(),
            state: p.state.clone(),
        }
    }
}

/// Complete shipping quote for a basket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub zone: ZoneCode,
    pub zone_name: String,
    pub gross_weight: f64,
    pub dimensional_weight: f64,
    pub billable_weight: f64,
    pub shipping_options: Vec<RateOption>,
    pub free_shipping_threshold: f64,
    pub free_shipping_enabled: bool,
    pub delivery_estimate: String,
    pub cod_available: bool,
    pub pickup_location: Option<LocationDetails>,
    pub delivery_location: Option<LocationDetails>,
    pub insurance_options: Vec<InsuranceOption>,
    pub insurance_mandatory: bool,
    pub recommended_insurance: Option<InsuranceOption>,
    /// True when the engine could not price the request and returned the
    /// conservative default quote instead.
    pub is_fallback: bool,
}

/// Request body for POST /shipping/quote.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub pickup_pincode: String,
    pub delivery_pincode: String,
    pub items: Vec<LineItem>,
    pub order_value: f64,
    #[serde(default)]
    pub options: QuoteOptions,
}

/// Query parameters for GET /shipping/zone.
#[derive(Debug, Deserialize)]
pub struct ZoneQuery {
    pub pickup: String,
    pub delivery: String,
}

/// Response for GET /shipping/zone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneResponse {
    pub zone: ZoneCode,
    pub zone_name: String,
    pub delivery_estimate: String,
}

/// Request body for POST /shipping/insurance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceRequest {
    pub order_value: f64,
    pub zone: ZoneCode,
    #[serde(default, flatten)]
    pub flags: RiskFlags,
}

/// Response for GET /pincodes/:pincode.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PincodeResponse {
    #[serde(flatten)]
    pub location: LocationDetails,
    pub serviceable: bool,
    pub cod_available: bool,
}

/// Round a money or weight value to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Returns true for a 6-digit numeric pincode.
pub fn is_valid_pincode(pincode: &str) -> bool {
    pincode.len() == 6 && pincode.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_code_round_trip_through_str() {
        for zone in ZoneCode::ALL {
            assert_eq!(zone.as_str().parse::<ZoneCode>().unwrap(), zone);
        }
        assert_eq!(" c ".parse::<ZoneCode>().unwrap(), ZoneCode::C);
        assert!("F".parse::<ZoneCode>().is_err());
    }

    #[test]
    fn test_threshold_key() {
        assert_eq!(ZoneCode::A.threshold_key(), "zone_a_threshold");
        assert_eq!(ZoneCode::E.threshold_key(), "zone_e_threshold");
    }

    #[test]
    fn test_billable_weight_takes_larger() {
        let heavy = WeightSummary {
            gross_weight: 1.1,
            dimensional_weight: 0.112,
            total_volume: 560.0,
        };
        assert_eq!(heavy.billable_weight(), 1.1);

        let bulky = WeightSummary {
            gross_weight: 0.3,
            dimensional_weight: 2.4,
            total_volume: 12000.0,
        };
        assert_eq!(bulky.billable_weight(), 2.4);
    }

    #[test]
    fn test_pincode_validation() {
        assert!(is_valid_pincode("110001"));
        assert!(!is_valid_pincode("11000"));
        assert!(!is_valid_pincode("1100011"));
        assert!(!is_valid_pincode("11000a"));
        assert!(!is_valid_pincode(""));
    }

    #[test]
    fn test_line_item_defaults() {
        let item: LineItem = serde_json::from_str("{}").unwrap();
        assert_eq!(item.quantity, 1);
        assert!(item.weight.is_none());
        assert!(item.dimensions.is_none());
    }

    #[test]
    fn test_line_item_null_quantity_is_one() {
        let item: LineItem = serde_json::from_str(r#"{"weight": 1.0, "quantity": null}"#).unwrap();
        assert_eq!(item.quantity, 1);

        let item: LineItem = serde_json::from_str(r#"{"quantity": 4}"#).unwrap();
        assert_eq!(item.quantity, 4);
    }

    #[test]
    fn test_partial_dimensions_resolve_per_side() {
        let item: LineItem =
            serde_json::from_str(r#"{"dimensions": {"length": 30, "width": null}}"#).unwrap();
        let defaults = Dimensions {
            length: 20.0,
            width: 14.0,
            height: 2.0,
        };

        let resolved = item.dimensions.unwrap().resolve(&defaults);
        assert_eq!(resolved.length, 30.0);
        assert_eq!(resolved.width, 14.0);
        assert_eq!(resolved.height, 2.0);
    }

    #[test]
    fn test_quote_options_camel_case() {
        let options: QuoteOptions =
            serde_json::from_str(r#"{"cod": true, "collectAmount": 1200.0}"#).unwrap();
        assert!(options.cod);
        assert_eq!(options.collect_amount, 1200.0);
        assert!(!options.has_electronics);
    }
}
