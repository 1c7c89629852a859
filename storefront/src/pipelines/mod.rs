// storefront/src/pipelines/mod.rs

//! Flows that orchestrate checkout and gateway events.

use crate::errors::AppError;
use tienda_flow::FlowRegistry;

pub mod checkout_pipeline;
pub mod contexts;
pub mod payment_flows;
pub mod reconcile;
pub mod webhook_pipeline;

/// Registers every flow the HTTP layer dispatches through the registry.
pub fn register_all_flows(registry: &FlowRegistry<AppError>) {
  tracing::info!("Registering storefront flows...");
  checkout_pipeline::register_checkout_pipeline(registry);
  webhook_pipeline::register_webhook_pipeline(registry);
  tracing::info!(flows = registry.len(), "Storefront flows registered.");
}
