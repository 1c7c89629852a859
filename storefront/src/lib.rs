// storefront/src/lib.rs

//! Tienda storefront and admin API.
//!
//! The binary in `main.rs` wires configuration, the Postgres pool, the payment
//! gateway and shipment tracker clients into an [`state::AppState`], registers
//! the checkout and webhook flows, and serves [`web::configure_app_routes`].

pub mod analytics;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod pricing;
pub mod services;
pub mod state;
pub mod web;
