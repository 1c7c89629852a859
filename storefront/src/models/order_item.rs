// storefront/src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price_cents: i64,
}

/// Item row joined with the product name, as shown on order detail pages.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItemDetail {
  pub id: Uuid,
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub line_total_cents: i64,
}
