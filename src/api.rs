//! HTTP API handlers for Zonerate.
//!
//! - **POST /shipping/quote**: Full quote for a basket. Always answers with a
//!   quote; degraded quotes carry `isFallback: true`.
//! - **GET /shipping/zone**: Zone for a pickup/delivery pair.
//! - **GET /shipping/free-shipping/:zone**: Resolved free-shipping policy.
//! - **POST /shipping/insurance**: Insurance options for an order value.
//! - **GET /pincodes/:pincode**: Location, serviceability and COD for a pincode.
//! - **POST /admin/cache/invalidate**: Drop cached zone lookups.
//! - **GET /health**: Health check.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::free_shipping::get_free_shipping_config;
use crate::insurance::calculate_insurance_options;
use crate::model::{
    FreeShippingConfig, InsuranceBundle, InsuranceRequest, LocationDetails, PincodeResponse,
    QuoteRequest, ShippingQuote, ZoneCode, ZoneQuery, ZoneResponse, is_valid_pincode, zone_name,
};
use crate::quote::ShippingEngine;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: ShippingEngine,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/shipping/quote", post(post_quote))
        .route("/shipping/zone", get(get_zone))
        .route("/shipping/free-shipping/:zone", get(get_free_shipping))
        .route("/shipping/insurance", post(post_insurance))
        .route("/pincodes/:pincode", get(get_pincode))
        .route("/admin/cache/invalidate", post(invalidate_cache))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /shipping/quote - Quote a basket.
///
/// # Request Body
///
/// ```json
/// {
///     "pickupPincode": "110001",
///     "deliveryPincode": "110005",
///     "items": [{ "weight": 1.0, "dimensions": { "length": 20, "width": 14, "height": 2 }, "quantity": 1 }],
///     "orderValue": 600.0,
///     "options": { "cod": false }
/// }
/// ```
///
/// Missing item weight or dimensions fall back to defaults; `options` may be omitted.
///
/// # Response
///
/// Always `200 OK` with a `ShippingQuote`.
#[instrument(skip_all, fields(pickup, delivery))]
pub async fn post_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Json<ShippingQuote> {
    tracing::Span::current().record("pickup", request.pickup_pincode.as_str());
    tracing::Span::current().record("delivery", request.delivery_pincode.as_str());

    let quote = state
        .engine
        .calculate_shipping_charges(
            &request.pickup_pincode,
            &request.delivery_pincode,
            &request.items,
            request.order_value,
            &request.options,
        )
        .await;

    info!(
        zone = %quote.zone,
        billable_weight = quote.billable_weight,
        fallback = quote.is_fallback,
        "Quote served"
    );

    Json(quote)
}

/// GET /shipping/zone - Zone for a pickup/delivery pair.
///
/// # Query Parameters
///
/// - `pickup` (required): 6-digit pickup pincode
/// - `delivery` (required): 6-digit delivery pincode
///
/// # Response
///
/// ```json
/// {
///     "zone": "A",
///     "zoneName": "Within City",
///     "deliveryEstimate": "1-2 business days"
/// }
/// ```
///
/// Returns `400 Bad Request` for malformed pincodes.
#[instrument(skip(state))]
pub async fn get_zone(
    State(state): State<AppState>,
    Query(query): Query<ZoneQuery>,
) -> Result<Json<ZoneResponse>, StatusCode> {
    if !is_valid_pincode(&query.pickup) || !is_valid_pincode(&query.delivery) {
        warn!(pickup = %query.pickup, delivery = %query.delivery, "Invalid pincode in zone query");
        return Err(StatusCode::BAD_REQUEST);
    }

    let zone = state
        .engine
        .zones()
        .determine_zone(&query.pickup, &query.delivery)
        .await;

    Ok(Json(ZoneResponse {
        zone,
        zone_name: zone_name(zone).to_string(),
        delivery_estimate: zone.delivery_estimate().to_string(),
    }))
}

/// GET /shipping/free-shipping/:zone - Free-shipping policy for a zone.
///
/// # Response
///
/// ```json
/// { "enabled": true, "threshold": 499.0 }
/// ```
#[instrument(skip(state))]
pub async fn get_free_shipping(
    State(state): State<AppState>,
    Path(zone): Path<String>,
) -> Result<Json<FreeShippingConfig>, StatusCode> {
    let zone: ZoneCode = zone.parse().map_err(|e: String| {
        warn!(error = %e, "Invalid zone");
        StatusCode::BAD_REQUEST
    })?;

    match get_free_shipping_config(state.engine.storage(), state.engine.config(), zone).await {
        Ok(policy) => Ok(Json(policy)),
        Err(e) => {
            warn!(zone = %zone, error = %e, "Failed to resolve free shipping policy");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /shipping/insurance - Insurance options for an order.
///
/// # Request Body
///
/// ```json
/// {
///     "orderValue": 12000.0,
///     "zone": "D",
///     "isRemote": false,
///     "hasFragileItems": true,
///     "hasElectronics": false
/// }
/// ```
#[instrument(skip(state))]
pub async fn post_insurance(
    State(state): State<AppState>,
    Json(request): Json<InsuranceRequest>,
) -> Result<Json<InsuranceBundle>, StatusCode> {
    match calculate_insurance_options(
        state.engine.storage(),
        request.order_value,
        request.zone,
        request.flags,
    )
    .await
    {
        Ok(bundle) => Ok(Json(bundle)),
        Err(e) => {
            warn!(zone = %request.zone, error = %e, "Failed to calculate insurance options");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /pincodes/:pincode - Location details for a pincode.
///
/// Returns `404 Not Found` for pincodes without a reference row.
#[instrument(skip(state))]
pub async fn get_pincode(
    State(state): State<AppState>,
    Path(pincode): Path<String>,
) -> Result<Json<PincodeResponse>, StatusCode> {
    match state.engine.storage().get_pincode(&pincode).await {
        Ok(Some(row)) => Ok(Json(PincodeResponse {
            location: LocationDetails::from(&row),
            serviceable: row.serviceable,
            cod_available: row.cod_available,
        })),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            warn!(pincode = %pincode, error = %e, "Failed to look up pincode");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /admin/cache/invalidate - Drop all cached zone lookups.
#[instrument(skip(state))]
pub async fn invalidate_cache(State(state): State<AppState>) -> impl IntoResponse {
    state.engine.zones().invalidate().await;
    info!("Zone cache invalidated");
    StatusCode::NO_CONTENT
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
