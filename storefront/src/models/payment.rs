// storefront/src/models/payment.rs

use crate::models::order::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  Card,
  Pse,
  Nequi,
}

impl PaymentMethod {
  /// Name of the method in gateway payloads (`payment_method.type`).
  pub fn gateway_type(&self) -> &'static str {
    match self {
      PaymentMethod::Card => "CARD",
      PaymentMethod::Pse => "PSE",
      PaymentMethod::Nequi => "NEQUI",
    }
  }

  pub fn from_gateway(raw: &str) -> Option<Self> {
    match raw.trim().to_ascii_uppercase().as_str() {
      "CARD" => Some(PaymentMethod::Card),
      "PSE" => Some(PaymentMethod::Pse),
      "NEQUI" => Some(PaymentMethod::Nequi),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Approved,
  Declined,
  Voided,
  Error,
}

impl PaymentStatus {
  /// Maps a gateway status string. Anything unrecognised is treated as `Error`.
  pub fn from_gateway(raw: &str) -> Self {
    match raw.trim().to_ascii_uppercase().as_str() {
      "PENDING" => PaymentStatus::Pending,
      "APPROVED" => PaymentStatus::Approved,
      "DECLINED" => PaymentStatus::Declined,
      "VOIDED" => PaymentStatus::Voided,
      _ => PaymentStatus::Error,
    }
  }

  pub fn is_final(&self) -> bool {
    !matches!(self, PaymentStatus::Pending)
  }

  /// Order status a payment in this state leads to.
  pub fn order_status(&self) -> OrderStatus {
    match self {
      PaymentStatus::Approved => OrderStatus::Paid,
      PaymentStatus::Pending => OrderStatus::PaymentDue,
      PaymentStatus::Declined | PaymentStatus::Voided | PaymentStatus::Error => OrderStatus::Failed,
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
  pub id: Uuid,
  pub order_id: Uuid,
  pub method: PaymentMethod,
  pub status: PaymentStatus,
  pub gateway_transaction_id: Option<String>,
  pub redirect_url: Option<String>,
  pub status_message: Option<String>,
  pub amount_cents: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gateway_statuses_map_onto_payment_status() {
    assert_eq!(PaymentStatus::from_gateway("APPROVED"), PaymentStatus::Approved);
    assert_eq!(PaymentStatus::from_gateway("pending"), PaymentStatus::Pending);
    assert_eq!(PaymentStatus::from_gateway("DECLINED"), PaymentStatus::Declined);
    assert_eq!(PaymentStatus::from_gateway("VOIDED"), PaymentStatus::Voided);
    assert_eq!(PaymentStatus::from_gateway("ERROR"), PaymentStatus::Error);
    assert_eq!(PaymentStatus::from_gateway("SOMETHING_NEW"), PaymentStatus::Error);
  }

  #[test]
  fn payment_status_drives_order_status() {
    assert_eq!(PaymentStatus::Approved.order_status(), OrderStatus::Paid);
    assert_eq!(PaymentStatus::Pending.order_status(), OrderStatus::PaymentDue);
    assert_eq!(PaymentStatus::Voided.order_status(), OrderStatus::Failed);
    assert!(!PaymentStatus::Pending.is_final());
    assert!(PaymentStatus::Declined.is_final());
  }

  #[test]
  fn gateway_method_names() {
    assert_eq!(PaymentMethod::from_gateway("nequi"), Some(PaymentMethod::Nequi));
    assert_eq!(PaymentMethod::Pse.gateway_type(), "PSE");
    assert_eq!(PaymentMethod::from_gateway("BANCOLOMBIA_QR"), None);
  }
}
