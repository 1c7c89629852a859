// storefront/src/pipelines/reconcile.rs

//! Applies a gateway transaction status to the local order and payment rows.
//! Shared by the checkout flow and gateway events; applying the same status
//! twice changes nothing.

use crate::db::orders::StockSettlement;
use crate::db::payments::PaymentRecord;
use crate::db::{orders, payments};
use crate::errors::{AppError, Result};
use crate::models::{OrderStatus, Payment, PaymentMethod, PaymentStatus};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionUpdate {
  pub reference: String,
  pub method: Option<PaymentMethod>,
  pub status: PaymentStatus,
  pub gateway_transaction_id: Option<String>,
  pub redirect_url: Option<String>,
  pub status_message: Option<String>,
  pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
  pub order_id: Uuid,
  pub reference: String,
  pub order_status: OrderStatus,
  pub payment_id: Uuid,
  pub payment_status: PaymentStatus,
  pub redirect_url: Option<String>,
  pub status_message: Option<String>,
  /// False when the rows already reflected this update.
  pub changed: bool,
  /// The payment was approved but its units could not be taken out of stock.
  /// The order keeps its status until stock is fixed and the payment settled again.
  pub needs_review: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPlan {
  Keep,
  Move(OrderStatus),
  /// The payment result no longer applies, e.g. the order was cancelled meanwhile.
  Ignore,
}

pub fn plan_order_transition(current: OrderStatus, payment: PaymentStatus) -> OrderPlan {
  let target = payment.order_status();
  if current == target {
    OrderPlan::Keep
  } else if current.can_transition_to(target) {
    OrderPlan::Move(target)
  } else {
    OrderPlan::Ignore
  }
}

/// An approval for a different amount than the order total is not trusted.
pub fn effective_status(order_total_cents: i64, update: &TransactionUpdate) -> (PaymentStatus, Option<String>) {
  if update.status == PaymentStatus::Approved && update.amount_cents != order_total_cents {
    return (
      PaymentStatus::Error,
      Some(format!(
        "Approved amount {} does not match order total {}.",
        update.amount_cents, order_total_cents
      )),
    );
  }
  (update.status, update.status_message.clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentPlan {
  Insert,
  Update(Uuid),
  /// The stored row already has this status, or a final one.
  Keep,
}

/// Decides what happens to the payment row for `incoming`. A transaction
/// recorded against another order is a conflict.
pub fn plan_payment(order_id: Uuid, existing: Option<&Payment>, incoming: PaymentStatus) -> Result<PaymentPlan> {
  match existing {
    None => Ok(PaymentPlan::Insert),
    Some(p) if p.order_id != order_id => Err(AppError::Conflict(format!(
      "Transaction is recorded against order {}, not {}.",
      p.order_id, order_id
    ))),
    Some(p) if p.status == incoming || p.status.is_final() => Ok(PaymentPlan::Keep),
    Some(p) => Ok(PaymentPlan::Update(p.id)),
  }
}

impl OrderPlan {
  /// Moving into `paid` is the one place units leave stock and coupons are redeemed.
  pub fn takes_stock(&self) -> bool {
    *self == OrderPlan::Move(OrderStatus::Paid)
  }
}

#[instrument(name = "reconcile::apply_transaction", skip(pool, update), fields(reference = %update.reference, status = ?update.status), err(Display))]
pub async fn apply_transaction(pool: &PgPool, update: &TransactionUpdate) -> Result<ReconcileOutcome> {
  let mut tx = pool.begin().await?;
  let order = orders::lock_by_reference(&mut *tx, &update.reference).await?;

  let (status, status_message) = effective_status(order.total_cents, update);
  if status != update.status {
    warn!(order_id = %order.id, ?status_message, "Gateway approval rejected locally.");
  }

  let record = |method: PaymentMethod| PaymentRecord {
    order_id: order.id,
    method,
    status,
    gateway_transaction_id: update.gateway_transaction_id.clone(),
    redirect_url: update.redirect_url.clone(),
    status_message: status_message.clone(),
    amount_cents: update.amount_cents,
  };

  let existing = match &update.gateway_transaction_id {
    Some(id) => payments::find_by_transaction(&mut *tx, id).await?,
    None => None,
  };
  let (payment, payment_changed) = match (plan_payment(order.id, existing.as_ref(), status)?, existing) {
    (PaymentPlan::Keep, Some(p)) => {
      if p.status != status {
        warn!(payment_id = %p.id, stored = ?p.status, incoming = ?status, "Ignoring status change of a final payment.");
      }
      (p, false)
    }
    (PaymentPlan::Update(id), Some(p)) => (payments::update(&mut *tx, id, &record(p.method)).await?, true),
    _ => {
      let method = update
        .method
        .ok_or_else(|| AppError::Validation("Transaction does not name a supported payment method.".to_string()))?;
      (payments::insert(&mut *tx, &record(method)).await?, true)
    }
  };

  let mut needs_review = false;
  let order_status = match plan_order_transition(order.status, payment.status) {
    OrderPlan::Keep => order.status,
    OrderPlan::Ignore => {
      warn!(order_id = %order.id, current = %order.status, payment = ?payment.status, "Payment result does not apply to order status.");
      order.status
    }
    plan @ OrderPlan::Move(next) if plan.takes_stock() => match orders::settle_payment(&mut *tx, &order).await? {
      StockSettlement::Taken => orders::set_status(&mut *tx, order.id, next).await?.status,
      StockSettlement::Short { product_id } => {
        error!(
          order_id = %order.id,
          %product_id,
          "Payment approved but stock ran short; order held for review."
        );
        needs_review = true;
        order.status
      }
    },
    OrderPlan::Move(next) => orders::set_status(&mut *tx, order.id, next).await?.status,
  };

  tx.commit().await?;
  let changed = payment_changed || order_status != order.status;
  info!(order_id = %order.id, %order_status, payment_status = ?payment.status, changed, "Transaction reconciled.");

  Ok(ReconcileOutcome {
    order_id: order.id,
    reference: order.reference,
    order_status,
    payment_id: payment.id,
    payment_status: payment.status,
    redirect_url: payment.redirect_url,
    status_message: payment.status_message,
    changed,
    needs_review,
  })
}
