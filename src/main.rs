//! Zonerate - Shipping zone and rate calculation engine.
//!
//! # API Endpoints
//!
//! - `POST /shipping/quote` - Quote a basket between two pincodes
//! - `GET /shipping/zone` - Zone for a pickup/delivery pair
//! - `GET /shipping/free-shipping/:zone` - Free-shipping policy for a zone
//! - `POST /shipping/insurance` - Insurance options for an order
//! - `GET /pincodes/:pincode` - Pincode serviceability
//! - `POST /admin/cache/invalidate` - Drop cached zone lookups
//! - `GET /health` - Health check

use std::env;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use zonerate::api::{AppState, router};
use zonerate::config::EngineConfig;
use zonerate::quote::ShippingEngine;
use zonerate::seed::seed_defaults;
use zonerate::storage::Storage;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
const DEFAULT_DB_PATH: &str = "sqlite:zonerate.db?mode=rwc";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("zonerate=info".parse()?))
        .init();

    // Load configuration from environment
    let port: u16 = env::var("ZONERATE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let db_url = env::var("ZONERATE_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

    let seed = env::var("ZONERATE_SEED_DEFAULTS")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let config = EngineConfig::from_env();

    info!(
        port,
        db_url = %db_url,
        dimensional_factor = config.dimensional_factor,
        zone_cache_ttl_secs = config.zone_cache_ttl.as_secs(),
        "Starting Zonerate server"
    );

    let storage = Storage::new(&db_url).await?;
    info!("Database initialized");

    if seed {
        seed_defaults(&storage, &config).await?;
    }

    let state = AppState {
        engine: ShippingEngine::new(storage, config),
    };
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Zonerate is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
