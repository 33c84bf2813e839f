//! SQLite reference data store for Zonerate.
//!
//! Holds the slowly-changing tables the engine prices from:
//!
//! - `pincodes`: serviceability and COD availability per postal code
//! - `shipping_weight_slabs`: included weight and courier per rate tier
//! - `shipping_zones`: rate rows per (zone, weight slab)
//! - `shipping_insurance`: insurance tier definitions
//! - `admin_settings`: key/value overrides such as `zone_a_threshold`
//!
//! The engine only reads these tables. The write methods exist for
//! back-office tooling, seeding and tests.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::model::{InsuranceTier, NewZoneRate, Pincode, WeightSlab, ZoneCode, ZoneRate};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:zonerate.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Every connection to an in-memory database is a separate database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create the database schema if it doesn't exist.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pincodes (
                pincode TEXT PRIMARY KEY,
                city TEXT NOT NULL DEFAULT '',
                state TEXT NOT NULL DEFAULT '',
                servesability INTEGER NOT NULL DEFAULT 1,
                cod_available INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shipping_weight_slabs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                base_weight REAL NOT NULL CHECK (base_weight > 0),
                courier_name TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shipping_zones (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                zone TEXT NOT NULL,
                weight_slab_id INTEGER NOT NULL REFERENCES shipping_weight_slabs(id),
                fwd_rate REAL NOT NULL,
                aw_rate REAL NOT NULL DEFAULT 0,
                cod_charges REAL NOT NULL DEFAULT 0,
                cod_percentage REAL NOT NULL DEFAULT 0,
                free_shipping_enabled INTEGER,
                free_shipping_threshold REAL,
                created_at INTEGER NOT NULL,
                UNIQUE (zone, weight_slab_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_shipping_zones_zone
            ON shipping_zones(zone)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shipping_insurance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                coverage_percentage REAL NOT NULL
                    CHECK (coverage_percentage > 0 AND coverage_percentage <= 100),
                premium_percentage REAL NOT NULL,
                min_premium REAL NOT NULL DEFAULT 0,
                max_premium REAL,
                risk_loading_percentage REAL NOT NULL DEFAULT 0,
                min_order_value REAL NOT NULL DEFAULT 0,
                max_order_value REAL,
                mandatory_above_value REAL,
                mandatory_for_remote INTEGER NOT NULL DEFAULT 0,
                mandatory_for_fragile INTEGER NOT NULL DEFAULT 0,
                mandatory_for_electronics INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admin_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up the serviceability row for a pincode.
    pub async fn get_pincode(&self, pincode: &str) -> anyhow::Result<Option<Pincode>> {
        let row = sqlx::query(
            r#"
            SELECT pincode, city, state, servesability, cod_available
            FROM pincodes
            WHERE pincode = ?
            "#,
        )
        .bind(pincode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Pincode {
            pincode: r.get("pincode"),
            city: r.get("city"),
            state: r.get("state"),
            serviceable: r.get("servesability"),
            cod_available: r.get("cod_available"),
        }))
    }

    /// Whether a pincode is known and serviceable.
    pub async fn is_serviceable(&self, pincode: &str) -> anyhow::Result<bool> {
        Ok(self
            .get_pincode(pincode)
            .await?
            .is_some_and(|p| p.serviceable))
    }

    /// Whether cash-on-delivery is offered at a pincode.
    pub async fn is_cod_available(&self, pincode: &str) -> anyhow::Result<bool> {
        Ok(self
            .get_pincode(pincode)
            .await?
            .is_some_and(|p| p.cod_available))
    }

    /// Insert or replace a pincode row.
    pub async fn upsert_pincode(&self, pincode: &Pincode) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pincodes (pincode, city, state, servesability, cod_available)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(pincode) DO UPDATE SET
                city = excluded.city,
                state = excluded.state,
                servesability = excluded.servesability,
                cod_available = excluded.cod_available
            "#,
        )
        .bind(&pincode.pincode)
        .bind(&pincode.city)
        .bind(&pincode.state)
        .bind(pincode.serviceable)
        .bind(pincode.cod_available)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a weight slab and return it with its assigned id.
    pub async fn insert_weight_slab(
        &self,
        base_weight: f64,
        courier_name: &str,
    ) -> anyhow::Result<WeightSlab> {
        anyhow::ensure!(base_weight > 0.0, "base_weight must be positive");

        let result = sqlx::query(
            r#"
            INSERT INTO shipping_weight_slabs (base_weight, courier_name)
            VALUES (?, ?)
            "#,
        )
        .bind(base_weight)
        .bind(courier_name)
        .execute(&self.pool)
        .await?;

        Ok(WeightSlab {
            id: result.last_insert_rowid(),
            base_weight,
            courier_name: courier_name.to_string(),
        })
    }

    /// Insert the rate row for a (zone, weight slab) pair.
    ///
    /// Fails if the pair already has a row.
    pub async fn insert_zone_rate(
        &self,
        zone: ZoneCode,
        weight_slab_id: i64,
        rate: &NewZoneRate,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO shipping_zones (
                zone, weight_slab_id, fwd_rate, aw_rate, cod_charges, cod_percentage,
                free_shipping_enabled, free_shipping_threshold, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(zone.as_str())
        .bind(weight_slab_id)
        .bind(rate.fwd_rate)
        .bind(rate.aw_rate)
        .bind(rate.cod_charges)
        .bind(rate.cod_percentage)
        .bind(rate.free_shipping_enabled)
        .bind(rate.free_shipping_threshold)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All rate rows for a zone joined with their slabs, in id order.
    pub async fn zone_rates(&self, zone: ZoneCode) -> anyhow::Result<Vec<ZoneRate>> {
        let rows = sqlx::query(
            r#"
            SELECT z.id, z.weight_slab_id, s.base_weight, s.courier_name,
                   z.fwd_rate, z.aw_rate, z.cod_charges, z.cod_percentage,
                   z.free_shipping_enabled, z.free_shipping_threshold
            FROM shipping_zones z
            JOIN shipping_weight_slabs s ON s.id = z.weight_slab_id
            WHERE z.zone = ?
            ORDER BY z.id
            "#,
        )
        .bind(zone.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| zone_rate_from_row(zone, r)).collect())
    }

    /// Free-shipping columns of the most recently created rate row for a zone.
    ///
    /// Returns `None` when the zone has no rate rows.
    pub async fn latest_free_shipping_config(
        &self,
        zone: ZoneCode,
    ) -> anyhow::Result<Option<(Option<bool>, Option<f64>)>> {
        let row = sqlx::query(
            r#"
            SELECT free_shipping_enabled, free_shipping_threshold
            FROM shipping_zones
            WHERE zone = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(zone.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            (
                r.get::<Option<bool>, _>("free_shipping_enabled"),
                r.get::<Option<f64>, _>("free_shipping_threshold"),
            )
        }))
    }

    /// Insert an insurance tier and return its id.
    ///
    /// The `id` field of `tier` is ignored.
    pub async fn insert_insurance_tier(&self, tier: &InsuranceTier) -> anyhow::Result<i64> {
        anyhow::ensure!(
            tier.coverage_percentage > 0.0 && tier.coverage_percentage <= 100.0,
            "coverage_percentage must be in (0, 100]"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO shipping_insurance (
                name, coverage_percentage, premium_percentage, min_premium, max_premium,
                risk_loading_percentage, min_order_value, max_order_value,
                mandatory_above_value, mandatory_for_remote, mandatory_for_fragile,
                mandatory_for_electronics, is_active
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tier.name)
        .bind(tier.coverage_percentage)
        .bind(tier.premium_percentage)
        .bind(tier.min_premium)
        .bind(tier.max_premium)
        .bind(tier.risk_loading_percentage)
        .bind(tier.min_order_value)
        .bind(tier.max_order_value)
        .bind(tier.mandatory_above_value)
        .bind(tier.mandatory_for_remote)
        .bind(tier.mandatory_for_fragile)
        .bind(tier.mandatory_for_electronics)
        .bind(tier.is_active)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All active insurance tiers, in id order.
    pub async fn active_insurance_tiers(&self) -> anyhow::Result<Vec<InsuranceTier>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, coverage_percentage, premium_percentage, min_premium, max_premium,
                   risk_loading_percentage, min_order_value, max_order_value,
                   mandatory_above_value, mandatory_for_remote, mandatory_for_fragile,
                   mandatory_for_electronics, is_active
            FROM shipping_insurance
            WHERE is_active = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(insurance_tier_from_row).collect())
    }

    /// Number of insurance tiers, active or not.
    pub async fn count_insurance_tiers(&self) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as total FROM shipping_insurance")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("total"))
    }

    /// Read an admin setting.
    pub async fn get_admin_setting(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM admin_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    /// Read a numeric admin setting, using `default` when absent or unparseable.
    pub async fn admin_setting_f64(&self, key: &str, default: f64) -> anyhow::Result<f64> {
        Ok(self
            .get_admin_setting(key)
            .await?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default))
    }

    /// Write an admin setting, replacing any existing value.
    pub async fn set_admin_setting(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_settings (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
impl Storage {
    /// Drop a reference table so reads against it fail.
    pub(crate) async fn drop_table(&self, table: &str) -> anyhow::Result<()> {
        let sql = format!("DROP TABLE {table}");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Check out a pool connection; in-memory pools have only one.
    pub(crate) async fn hold_connection(
        &self,
    ) -> anyhow::Result<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        Ok(self.pool.acquire().await?)
    }
}

fn zone_rate_from_row(zone: ZoneCode, r: &SqliteRow) -> ZoneRate {
    ZoneRate {
        id: r.get("id"),
        zone,
        weight_slab_id: r.get("weight_slab_id"),
        base_weight: r.get("base_weight"),
        courier_name: r.get("courier_name"),
        fwd_rate: r.get("fwd_rate"),
        aw_rate: r.get("aw_rate"),
        cod_charges: r.get("cod_charges"),
        cod_percentage: r.get("cod_percentage"),
        free_shipping_enabled: r.get("free_shipping_enabled"),
        free_shipping_threshold: r.get("free_shipping_threshold"),
    }
}

fn insurance_tier_from_row(r: &SqliteRow) -> InsuranceTier {
    InsuranceTier {
        id: r.get("id"),
        name: r.get("name"),
        coverage_percentage: r.get("coverage_percentage"),
        premium_percentage: r.get("premium_percentage"),
        min_premium: r.get("min_premium"),
        max_premium: r.get("max_premium"),
        risk_loading_percentage: r.get("risk_loading_percentage"),
        min_order_value: r.get("min_order_value"),
        max_order_value: r.get("max_order_value"),
        mandatory_above_value: r.get("mandatory_above_value"),
        mandatory_for_remote: r.get("mandatory_for_remote"),
        mandatory_for_fragile: r.get("mandatory_for_fragile"),
        mandatory_for_electronics: r.get("mandatory_for_electronics"),
        is_active: r.get("is_active"),
    }
}
