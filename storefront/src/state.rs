// storefront/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::{PaymentGateway, ShipmentTracker};
use sqlx::PgPool;
use std::sync::Arc;
use tienda_flow::FlowRegistry;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub tracker: Arc<dyn ShipmentTracker>,
}
