//! Zonerate - Shipping zone and rate calculation engine.
//!
//! # Overview
//!
//! Given a pickup pincode, a delivery pincode, a basket of items and the
//! payment context, Zonerate works out:
//!
//! - the shipping zone (A: same city … E: northeast/J&K)
//! - gross, dimensional and billable weight
//! - the applicable carrier rate options for that zone and weight
//! - COD surcharges and free-shipping waivers
//! - eligible and mandatory insurance tiers
//!
//! Quoting never fails outward. When reference data is missing or broken the
//! engine degrades to legacy rates, zone D, or a conservative fallback quote.
//!
//! # Modules
//!
//! - [`model`]: Reference data rows, quote request and response types
//! - [`config`]: Injected engine configuration
//! - [`error`]: Quote errors and the fallback quote
//! - [`storage`]: SQLite reference data store
//! - [`zone`]: Zone determination with a TTL cache
//! - [`weight`]: Gross and dimensional weight
//! - [`rates`]: Rate selection and legacy rates
//! - [`free_shipping`]: Per-zone free-shipping policy
//! - [`insurance`]: Insurance eligibility and premiums
//! - [`quote`]: The orchestrating [`quote::ShippingEngine`]
//! - [`seed`]: Default reference data
//! - [`api`]: HTTP API handlers

pub mod api;
pub mod config;
pub mod error;
pub mod free_shipping;
pub mod insurance;
pub mod model;
pub mod quote;
pub mod rates;
pub mod seed;
pub mod storage;
pub mod weight;
pub mod zone;
