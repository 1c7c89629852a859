// storefront/src/pricing.rs

//! Order totals. Everything here is pure so checkout and coupon previews agree.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::Coupon;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
  pub unit_price_cents: i64,
  pub quantity: i32,
}

impl LineItem {
  pub fn total_cents(&self) -> i64 {
    self.unit_price_cents * i64::from(self.quantity)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
  /// Orders whose discounted subtotal reaches this amount ship for free.
  pub free_threshold_cents: i64,
  pub flat_cents: i64,
}

impl ShippingPolicy {
  pub fn from_config(config: &AppConfig) -> Self {
    Self {
      free_threshold_cents: config.free_shipping_threshold_cents,
      flat_cents: config.flat_shipping_cents,
    }
  }

  pub fn shipping_for(&self, discounted_subtotal_cents: i64) -> i64 {
    if discounted_subtotal_cents >= self.free_threshold_cents {
      0
    } else {
      self.flat_cents
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
}

pub fn price_order(
  items: &[LineItem],
  coupon: Option<&Coupon>,
  shipping: ShippingPolicy,
  now: DateTime<Utc>,
) -> Result<PriceBreakdown> {
  if items.is_empty() {
    return Err(AppError::Validation("Order must contain at least one item.".to_string()));
  }
  if let Some(bad) = items.iter().find(|i| i.quantity <= 0 || i.unit_price_cents <= 0) {
    return Err(AppError::Validation(format!(
      "Invalid line item: quantity {} at {} cents.",
      bad.quantity, bad.unit_price_cents
    )));
  }

  let subtotal_cents: i64 = items.iter().map(LineItem::total_cents).sum();
  let discount_cents = match coupon {
    Some(c) => c.discount_for(subtotal_cents, now)?,
    None => 0,
  };
  let discounted = subtotal_cents - discount_cents;
  let shipping_cents = shipping.shipping_for(discounted);

  Ok(PriceBreakdown {
    subtotal_cents,
    discount_cents,
    shipping_cents,
    total_cents: discounted + shipping_cents,
  })
}
