//! Rate selection for a zone and billable weight.
//!
//! Every rate row whose slab can carry the weight becomes an option, tightest
//! slab first. Weight beyond a slab's `base_weight` is charged in whole
//! multiples of that base weight at `aw_rate`. A zone without any rate rows is
//! priced from the legacy table in [`EngineConfig`].

use tracing::{debug, warn};

use crate::config::{EngineConfig, LEGACY_BREAKPOINTS};
use crate::model::{QuoteOptions, RateOption, ZoneCode, ZoneRate, round2};
use crate::storage::Storage;

/// Tolerance for comparing weights that went through float arithmetic.
const WEIGHT_EPSILON: f64 = 1e-9;

/// Load the zone's rate rows and price every applicable option.
///
/// Always returns at least one option.
pub async fn get_shipping_options(
    storage: &Storage,
    config: &EngineConfig,
    zone: ZoneCode,
    billable_weight: f64,
    options: &QuoteOptions,
) -> anyhow::Result<Vec<RateOption>> {
    let rows = storage.zone_rates(zone).await?;

    if rows.is_empty() {
        warn!(zone = %zone, "No rate rows configured, using legacy rates");
    }

    Ok(select_rate_options(config, zone, billable_weight, &rows, options))
}

/// Price `rows` for a zone and weight.
///
/// Candidates are rows whose `base_weight` covers the weight, ordered by
/// ascending `base_weight` with ties kept in row order. If no slab is large
/// enough, the largest slabs are priced with additional-weight charges. With no
/// rows at all, a single legacy option is returned.
pub fn select_rate_options(
    config: &EngineConfig,
    zone: ZoneCode,
    billable_weight: f64,
    rows: &[ZoneRate],
    options: &QuoteOptions,
) -> Vec<RateOption> {
    if rows.is_empty() {
        return vec![legacy_rate_option(config, zone, billable_weight, options)];
    }

    let mut candidates: Vec<&ZoneRate> = rows
        .iter()
        .filter(|r| r.base_weight + WEIGHT_EPSILON >= billable_weight)
        .collect();

    if candidates.is_empty() {
        let largest = rows
            .iter()
            .map(|r| r.base_weight)
            .fold(f64::MIN, f64::max);
        debug!(
            zone = %zone,
            billable_weight,
            largest_slab = largest,
            "No slab covers weight, pricing from largest slab"
        );
        candidates = rows
            .iter()
            .filter(|r| (r.base_weight - largest).abs() < WEIGHT_EPSILON)
            .collect();
    }

    candidates.sort_by(|a, b| a.base_weight.total_cmp(&b.base_weight));

    candidates
        .into_iter()
        .map(|row| price_row(row, billable_weight, options))
        .collect()
}

fn price_row(row: &ZoneRate, billable_weight: f64, options: &QuoteOptions) -> RateOption {
    let base_cost = round2(row.fwd_rate);
    let additional_weight_charge = round2(additional_weight_charge(
        billable_weight,
        row.base_weight,
        row.aw_rate,
    ));
    let cod_charge = round2(cod_charge(row.cod_charges, row.cod_percentage, options));
    let total_cost = round2(base_cost + additional_weight_charge + cod_charge);

    RateOption {
        courier: row.courier_name.clone(),
        slab_weight: row.base_weight,
        base_cost,
        additional_weight_charge,
        cod_charge,
        total_cost,
        final_cost: total_cost,
        is_free_shipping: false,
    }
}

/// Charge for weight beyond `base_weight`, in started multiples of `base_weight`.
pub fn additional_weight_charge(billable_weight: f64, base_weight: f64, aw_rate: f64) -> f64 {
    if base_weight <= 0.0 || billable_weight <= base_weight + WEIGHT_EPSILON {
        return 0.0;
    }
    started_units((billable_weight - base_weight) / base_weight) * aw_rate
}

/// COD fee: the larger of the fixed fee and the percentage of the collect amount.
pub fn cod_charge(fixed: f64, percentage: f64, options: &QuoteOptions) -> f64 {
    if !options.cod {
        return 0.0;
    }
    fixed.max(percentage / 100.0 * options.collect_amount.max(0.0))
}

/// Price a weight from the legacy table.
pub fn legacy_rate_option(
    config: &EngineConfig,
    zone: ZoneCode,
    billable_weight: f64,
    options: &QuoteOptions,
) -> RateOption {
    let (slab_weight, base_cost, additional_weight_charge) = match config.legacy_rate(zone) {
        Some(legacy) => {
            match LEGACY_BREAKPOINTS
                .iter()
                .position(|bp| billable_weight <= bp + WEIGHT_EPSILON)
            {
                Some(index) => (LEGACY_BREAKPOINTS[index], legacy.rates[index], 0.0),
                None => {
                    let last = LEGACY_BREAKPOINTS.len() - 1;
                    let extra = billable_weight - LEGACY_BREAKPOINTS[last];
                    (
                        LEGACY_BREAKPOINTS[last],
                        legacy.rates[last],
                        started_units(extra) * legacy.additional_kg_rate,
                    )
                }
            }
        }
        None => (config.fallback_weight, config.fallback_base_cost, 0.0),
    };

    let base_cost = round2(base_cost);
    let additional_weight_charge = round2(additional_weight_charge);
    let cod_charge = round2(cod_charge(
        config.legacy_cod_charges,
        config.legacy_cod_percentage,
        options,
    ));
    let total_cost = round2(base_cost + additional_weight_charge + cod_charge);

    RateOption {
        courier: config.legacy_courier.clone(),
        slab_weight,
        base_cost,
        additional_weight_charge,
        cod_charge,
        total_cost,
        final_cost: total_cost,
        is_free_shipping: false,
    }
}

/// Number of started units in `ratio`, ignoring float noise below a microunit.
fn started_units(ratio: f64) -> f64 {
    ((ratio * 1e6).round() / 1e6).ceil()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, base_weight: f64, courier: &str, fwd_rate: f64, aw_rate: f64) -> ZoneRate {
        ZoneRate {
            id,
            zone: ZoneCode::A,
            weight_slab_id: id,
            base_weight,
            courier_name: courier.to_string(),
            fwd_rate,
            aw_rate,
            cod_charges: 40.0,
            cod_percentage: 2.0,
            free_shipping_enabled: None,
            free_shipping_threshold: None,
        }
    }

    fn prepaid() -> QuoteOptions {
        QuoteOptions::default()
    }

    fn cod(collect_amount: f64) -> QuoteOptions {
        QuoteOptions {
            cod: true,
            collect_amount,
            ..Default::default()
        }
    }

    #[test]
    fn test_additional_weight_is_zero_within_slab() {
        assert_eq!(additional_weight_charge(0.5, 0.5, 30.0), 0.0);
        assert_eq!(additional_weight_charge(0.3, 0.5, 30.0), 0.0);
    }

    #[test]
    fn test_additional_weight_steps_by_base_multiple() {
        assert_eq!(additional_weight_charge(0.51, 0.5, 30.0), 30.0);
        assert_eq!(additional_weight_charge(1.0, 0.5, 30.0), 30.0);
        assert_eq!(additional_weight_charge(1.01, 0.5, 30.0), 60.0);
        assert_eq!(additional_weight_charge(1.5, 0.5, 30.0), 60.0);
        assert_eq!(additional_weight_charge(1.2, 0.4, 10.0), 20.0);
    }

    #[test]
    fn test_cod_charge_has_fixed_floor() {
        assert_eq!(cod_charge(40.0, 2.0, &cod(0.0)), 40.0);
        assert_eq!(cod_charge(40.0, 2.0, &cod(100.0)), 40.0);
        assert_eq!(cod_charge(40.0, 2.0, &cod(5000.0)), 100.0);
        assert_eq!(cod_charge(40.0, 2.0, &prepaid()), 0.0);
    }

    #[test]
    fn test_tightest_slab_first_and_all_covering_returned() {
        let config = EngineConfig::default();
        let rows = vec![
            row(1, 2.0, "Bluedart", 90.0, 40.0),
            row(2, 0.5, "Delhivery", 35.0, 30.0),
            row(3, 1.0, "Ekart", 50.0, 35.0),
        ];

        let options = select_rate_options(&config, ZoneCode::A, 0.8, &rows, &prepaid());

        let couriers: Vec<&str> = options.iter().map(|o| o.courier.as_str()).collect();
        assert_eq!(couriers, vec!["Ekart", "Bluedart"]);
        assert!(options.iter().all(|o| o.additional_weight_charge == 0.0));
        assert_eq!(options[0].total_cost, 50.0);
    }

    #[test]
    fn test_tied_slabs_returned_as_separate_options() {
        let config = EngineConfig::default();
        let rows = vec![
            row(1, 1.0, "Delhivery", 50.0, 30.0),
            row(2, 1.0, "Ekart", 45.0, 30.0),
        ];

        let options = select_rate_options(&config, ZoneCode::A, 0.9, &rows, &prepaid());

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].courier, "Delhivery");
        assert_eq!(options[1].courier, "Ekart");
    }

    #[test]
    fn test_overweight_prices_from_largest_slab() {
        let config = EngineConfig::default();
        let rows = vec![
            row(1, 0.5, "Delhivery", 35.0, 30.0),
            row(2, 2.0, "Bluedart", 90.0, 40.0),
        ];

        let options = select_rate_options(&config, ZoneCode::A, 5.0, &rows, &prepaid());

        assert_eq!(options.len(), 1);
        assert_eq!(options[0].courier, "Bluedart");
        // 3 kg over a 2 kg slab → 2 started units.
        assert_eq!(options[0].additional_weight_charge, 80.0);
        assert_eq!(options[0].total_cost, 170.0);
    }

    #[test]
    fn test_cod_added_to_total() {
        let config = EngineConfig::default();
        let rows = vec![row(1, 1.0, "Delhivery", 50.0, 30.0)];

        let options = select_rate_options(&config, ZoneCode::A, 1.0, &rows, &cod(3000.0));

        assert_eq!(options[0].cod_charge, 60.0);
        assert_eq!(options[0].total_cost, 110.0);
        assert_eq!(options[0].final_cost, 110.0);
    }

    #[test]
    fn test_no_rows_gives_single_legacy_option() {
        let config = EngineConfig::default();

        let options = select_rate_options(&config, ZoneCode::B, 1.5, &[], &prepaid());

        assert_eq!(options.len(), 1);
        assert_eq!(options[0].courier, "Standard");
        assert_eq!(options[0].slab_weight, 2.0);
        assert_eq!(options[0].base_cost, 90.0);
    }

    #[test]
    fn test_legacy_overage_per_started_kg() {
        let config = EngineConfig::default();

        let option = legacy_rate_option(&config, ZoneCode::D, 12.3, &prepaid());

        assert_eq!(option.base_cost, 330.0);
        assert_eq!(option.additional_weight_charge, 90.0);
        assert_eq!(option.total_cost, 420.0);
    }

    #[test]
    fn test_legacy_breakpoint_boundaries() {
        let config = EngineConfig::default();
        assert_eq!(legacy_rate_option(&config, ZoneCode::A, 0.5, &prepaid()).base_cost, 40.0);
        assert_eq!(legacy_rate_option(&config, ZoneCode::A, 0.51, &prepaid()).base_cost, 55.0);
        assert_eq!(legacy_rate_option(&config, ZoneCode::A, 10.0, &prepaid()).base_cost, 200.0);
    }

    #[test]
    fn test_legacy_cod_floor() {
        let config = EngineConfig::default();
        let option = legacy_rate_option(&config, ZoneCode::A, 0.5, &cod(100.0));
        assert_eq!(option.cod_charge, 50.0);
        assert_eq!(option.total_cost, 90.0);
    }

    #[tokio::test]
    async fn test_get_shipping_options_reads_storage() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let config = EngineConfig::default();

        let legacy = get_shipping_options(&storage, &config, ZoneCode::C, 0.4, &prepaid())
            .await
            .unwrap();
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].base_cost, 60.0);

        let slab = storage.insert_weight_slab(0.5, "Delhivery").await.unwrap();
        storage
            .insert_zone_rate(
                ZoneCode::C,
                slab.id,
                &crate::model::NewZoneRate {
                    fwd_rate: 45.0,
                    aw_rate: 40.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let options = get_shipping_options(&storage, &config, ZoneCode::C, 0.4, &prepaid())
            .await
            .unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].courier, "Delhivery");
        assert_eq!(options[0].total_cost, 45.0);
    }
}
