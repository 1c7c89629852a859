// storefront/src/services/mod.rs

//! Integrations and helpers used by flows and handlers.

pub mod auth_service;
pub mod gateway;
pub mod http;
pub mod shipping;
pub mod signature;
pub mod wompi;

pub use gateway::PaymentGateway;
pub use shipping::ShipmentTracker;
