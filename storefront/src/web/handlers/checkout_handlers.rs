// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{OrderStatus, PaymentStatus};
use crate::pipelines::contexts::{CheckoutCtx, CheckoutRequest};
use crate::pipelines::reconcile::ReconcileOutcome;
use crate::state::AppState;
use crate::web::extractors::MaybeUser;
use tienda_flow::{ContextData, FlowOutcome};

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
  pub order_id: Uuid,
  pub reference: String,
  pub order_status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub total_cents: i64,
  pub currency: String,
  /// PSE: where the customer finishes the payment at their bank.
  pub redirect_url: Option<String>,
  pub message: Option<String>,
}

/// 201 when the payment was approved or is still pending, 402 when it failed.
/// Both carry the order so the client can retry or show the bank redirect.
pub fn checkout_response(outcome: ReconcileOutcome, total_cents: i64, currency: String) -> HttpResponse {
  let failed = matches!(
    outcome.payment_status,
    PaymentStatus::Declined | PaymentStatus::Voided | PaymentStatus::Error
  );
  let body = CheckoutResponse {
    order_id: outcome.order_id,
    reference: outcome.reference,
    order_status: outcome.order_status,
    payment_status: outcome.payment_status,
    total_cents,
    currency,
    redirect_url: outcome.redirect_url,
    message: if outcome.needs_review {
      Some("Payment received. The order is on hold until stock is confirmed.".to_string())
    } else {
      outcome.status_message
    },
  };
  if failed {
    HttpResponse::PaymentRequired().json(body)
  } else {
    HttpResponse::Created().json(body)
  }
}

#[instrument(
  name = "handler::checkout",
  skip(app_state, req_payload),
  fields(method = ?req_payload.payment.method(), items = req_payload.items.len())
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  user: MaybeUser,
  req_payload: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(CheckoutCtx::new(
    app_state.get_ref().clone(),
    req_payload.into_inner(),
    user.0,
  ));

  match app_state.flows.run(ctx.clone()).await? {
    FlowOutcome::Completed => {
      let guard = ctx.read();
      let order = guard
        .order
        .as_ref()
        .ok_or_else(|| AppError::Internal("Checkout completed without an order.".to_string()))?;
      let outcome = guard
        .outcome
        .clone()
        .ok_or_else(|| AppError::Internal("Checkout completed without reconciling the order.".to_string()))?;
      info!(
        order_id = %outcome.order_id,
        payment_status = ?outcome.payment_status,
        order_status = %outcome.order_status,
        "Checkout finished."
      );
      Ok(checkout_response(outcome, order.total_cents, order.currency.clone()))
    }
    FlowOutcome::Stopped => {
      warn!("Checkout flow stopped before reconciling the order.");
      Err(AppError::Internal("Checkout was halted before completion.".to_string()))
    }
  }
}

#[instrument(name = "handler::pse_banks", skip(app_state))]
pub async fn pse_banks_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let banks = app_state.gateway.financial_institutions().await?;
  Ok(HttpResponse::Ok().json(banks))
}
