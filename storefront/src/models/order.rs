// storefront/src/models/order.rs

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  PaymentDue,
  Paid,
  Failed,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 7] = [
    OrderStatus::Pending,
    OrderStatus::PaymentDue,
    OrderStatus::Paid,
    OrderStatus::Failed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  /// Statuses whose totals count as revenue on the dashboard.
  pub const REVENUE: [OrderStatus; 3] = [OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Delivered];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::PaymentDue => "payment_due",
      OrderStatus::Paid => "paid",
      OrderStatus::Failed => "failed",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  pub fn is_revenue(&self) -> bool {
    Self::REVENUE.contains(self)
  }

  pub fn can_transition_to(&self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, PaymentDue)
        | (Pending, Paid)
        | (PaymentDue, Paid)
        | (Paid, Shipped)
        | (Shipped, Delivered)
        | (Pending, Failed)
        | (PaymentDue, Failed)
        | (Pending, Cancelled)
        | (PaymentDue, Cancelled)
        | (Paid, Cancelled)
        | (Failed, PaymentDue)
    )
  }

  /// Only a paid order holds units taken out of stock.
  pub fn returns_stock_on(&self, next: OrderStatus) -> bool {
    *self == OrderStatus::Paid && next == OrderStatus::Cancelled
  }

  /// Returns `next` if the move is allowed, a validation error otherwise.
  pub fn transition_to(&self, next: OrderStatus) -> Result<OrderStatus> {
    if self.can_transition_to(next) {
      Ok(next)
    } else {
      Err(AppError::Validation(format!(
        "Order cannot move from '{}' to '{}'.",
        self, next
      )))
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s.trim())
      .ok_or_else(|| AppError::Validation(format!("Unknown order status '{}'.", s)))
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub address_id: Option<Uuid>,
  pub coupon_id: Option<Uuid>,
  pub status: OrderStatus,
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub currency: String,
  pub reference: String,
  pub carrier: Option<String>,
  pub tracking_number: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Merchant reference sent to the gateway, e.g. `TDA-20261018-1a2b3c4d5e6f`.
pub fn new_reference(now: DateTime<Utc>) -> String {
  let id = Uuid::new_v4().simple().to_string();
  format!("TDA-{}-{}", now.format("%Y%m%d"), &id[..12])
}

#[cfg(test)]
mod tests {
  use super::*;
  use OrderStatus::*;

  #[test]
  fn happy_path_transitions_are_allowed() {
    assert!(Pending.can_transition_to(PaymentDue));
    assert!(PaymentDue.can_transition_to(Paid));
    assert!(Paid.can_transition_to(Shipped));
    assert!(Shipped.can_transition_to(Delivered));
    assert!(Failed.can_transition_to(PaymentDue));
    assert!(Paid.can_transition_to(Cancelled));
  }

  #[test]
  fn backwards_and_terminal_transitions_are_rejected() {
    assert!(!Delivered.can_transition_to(Shipped));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Cancelled.can_transition_to(PaymentDue));
    assert!(!Paid.can_transition_to(Paid));
    assert!(matches!(Delivered.transition_to(Paid), Err(AppError::Validation(_))));
  }

  #[test]
  fn only_cancelling_a_paid_order_restocks() {
    assert!(Paid.returns_stock_on(Cancelled));
    assert!(!Pending.returns_stock_on(Cancelled));
    assert!(!PaymentDue.returns_stock_on(Cancelled));
    assert!(!Paid.returns_stock_on(Shipped));
  }

  #[test]
  fn parses_and_displays_snake_case() {
    assert_eq!("payment_due".parse::<OrderStatus>().unwrap(), PaymentDue);
    assert_eq!(Shipped.to_string(), "shipped");
    assert!("refunded".parse::<OrderStatus>().is_err());
    assert!(Delivered.is_revenue());
    assert!(!PaymentDue.is_revenue());
  }

  #[test]
  fn references_are_unique_and_dated() {
    let now = Utc::now();
    let a = new_reference(now);
    let b = new_reference(now);
    assert_ne!(a, b);
    assert!(a.starts_with(&format!("TDA-{}-", now.format("%Y%m%d"))));
  }
}
