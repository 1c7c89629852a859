// storefront/src/pipelines/payment_flows.rs

//! Provider sub-flows run by the checkout `process_payment` branch.
//!
//! - card:  fetch_acceptance → tokenize_card → charge → poll_status
//! - pse:   fetch_acceptance → charge → poll_status
//! - nequi: fetch_acceptance → charge → poll_status
//!
//! Gateway failures before a transaction exists are recorded on the context as
//! an `error` payment and the remaining steps are skipped, so checkout still
//! reconciles the order. The sub-flows never stop the parent flow.

use crate::errors::{AppError, Result};
use crate::models::PaymentStatus;
use crate::pipelines::contexts::{PaymentCtx, PaymentInput};
use crate::services::gateway::{ChargeMethod, ChargeRequest};
use std::sync::Arc;
use tienda_flow::{ContextData, Flow, FlowControl, SkipCondition};
use tracing::{info, instrument, warn};

pub const FETCH_ACCEPTANCE: &str = "fetch_acceptance";
pub const TOKENIZE_CARD: &str = "tokenize_card";
pub const CHARGE: &str = "charge";
pub const POLL_STATUS: &str = "poll_status";

fn after_failure() -> SkipCondition<PaymentCtx> {
  Arc::new(|ctx: ContextData<PaymentCtx>| ctx.read().failure.is_some())
}

fn nothing_to_poll() -> SkipCondition<PaymentCtx> {
  Arc::new(|ctx: ContextData<PaymentCtx>| {
    let guard = ctx.read();
    guard.failure.is_some() || guard.transaction.is_none() || guard.status.is_final() || guard.awaiting_bank_redirect()
  })
}

pub fn card_flow() -> Flow<PaymentCtx, AppError> {
  let mut flow = Flow::new(&[
    (FETCH_ACCEPTANCE, false, None),
    (TOKENIZE_CARD, false, Some(after_failure())),
    (CHARGE, false, Some(after_failure())),
    (POLL_STATUS, false, Some(nothing_to_poll())),
  ]);
  flow.on(FETCH_ACCEPTANCE, fetch_acceptance);
  flow.on(TOKENIZE_CARD, tokenize_card);
  flow.on(CHARGE, charge);
  flow.on(POLL_STATUS, poll_status);
  flow
}

pub fn pse_flow() -> Flow<PaymentCtx, AppError> {
  let mut flow = Flow::new(&[
    (FETCH_ACCEPTANCE, false, None),
    (CHARGE, false, Some(after_failure())),
    (POLL_STATUS, false, Some(nothing_to_poll())),
  ]);
  flow.on(FETCH_ACCEPTANCE, fetch_acceptance);
  flow.on(CHARGE, charge);
  flow.on(POLL_STATUS, poll_status);
  flow
}

pub fn nequi_flow() -> Flow<PaymentCtx, AppError> {
  let mut flow = Flow::new(&[
    (FETCH_ACCEPTANCE, false, None),
    (CHARGE, false, Some(after_failure())),
    (POLL_STATUS, false, Some(nothing_to_poll())),
  ]);
  flow.on(FETCH_ACCEPTANCE, fetch_acceptance);
  flow.on(CHARGE, charge);
  flow.on(POLL_STATUS, poll_status);
  flow
}

#[instrument(name = "payment::fetch_acceptance", skip_all)]
async fn fetch_acceptance(ctx: ContextData<PaymentCtx>) -> Result<FlowControl> {
  let gateway = ctx.read().gateway.clone();
  match gateway.acceptance_token().await {
    Ok(token) => ctx.write().acceptance_token = Some(token.acceptance_token),
    Err(e) => {
      warn!(error = %e, "Could not obtain acceptance token.");
      ctx.write().record_failure(format!("Gateway unavailable: {}", e));
    }
  }
  Ok(FlowControl::Continue)
}

#[instrument(name = "payment::tokenize_card", skip_all)]
async fn tokenize_card(ctx: ContextData<PaymentCtx>) -> Result<FlowControl> {
  let (gateway, card) = {
    let guard = ctx.read();
    match &guard.instrument {
      PaymentInput::Card(card) => (guard.gateway.clone(), card.clone()),
      other => {
        return Err(AppError::Internal(format!(
          "Card tokenization reached with {:?} payment.",
          other.method()
        )))
      }
    }
  };
  match gateway.tokenize_card(&card).await {
    Ok(token) => ctx.write().card_token = Some(token),
    Err(e) => {
      warn!(error = %e, last_four = %card.last_four(), "Card tokenization failed.");
      ctx.write().record_failure(format!("Card was rejected: {}", e));
    }
  }
  Ok(FlowControl::Continue)
}

fn charge_request(payment: &PaymentCtx) -> Result<ChargeRequest> {
  let acceptance_token = payment
    .acceptance_token
    .clone()
    .ok_or_else(|| AppError::Internal("Charge attempted without acceptance token.".to_string()))?;
  let method = match &payment.instrument {
    PaymentInput::Card(card) => ChargeMethod::Card {
      token: payment
        .card_token
        .clone()
        .ok_or_else(|| AppError::Internal("Card charge attempted without token.".to_string()))?,
      installments: card.installments.max(1),
    },
    PaymentInput::Pse(details) => ChargeMethod::Pse {
      details: details.clone(),
      description: format!("Pedido {}", payment.reference),
    },
    PaymentInput::Nequi { phone_number } => ChargeMethod::Nequi {
      phone_number: phone_number.clone(),
    },
  };
  Ok(ChargeRequest {
    amount_in_cents: payment.amount_in_cents,
    currency: payment.currency.clone(),
    customer_email: payment.customer_email.clone(),
    customer_full_name: payment.customer_full_name.clone(),
    customer_phone: payment.customer_phone.clone(),
    reference: payment.reference.clone(),
    acceptance_token,
    method,
    redirect_url: payment.redirect_url.clone(),
  })
}

#[instrument(name = "payment::charge", skip_all)]
async fn charge(ctx: ContextData<PaymentCtx>) -> Result<FlowControl> {
  let (gateway, request) = {
    let guard = ctx.read();
    (guard.gateway.clone(), charge_request(&guard)?)
  };
  match gateway.create_transaction(&request).await {
    Ok(transaction) => {
      info!(transaction_id = %transaction.id, status = ?transaction.status, "Gateway transaction created.");
      ctx.write().apply_transaction(transaction);
    }
    Err(e) => {
      warn!(error = %e, reference = %request.reference, "Gateway refused the transaction.");
      ctx.write().record_failure(format!("Payment could not be created: {}", e));
    }
  }
  Ok(FlowControl::Continue)
}

/// Polls until a final status, a PSE bank URL, or the attempt budget runs out.
/// A poll error leaves the payment pending; the gateway event settles it later.
#[instrument(name = "payment::poll_status", skip_all)]
async fn poll_status(ctx: ContextData<PaymentCtx>) -> Result<FlowControl> {
  let (gateway, policy, transaction_id) = {
    let guard = ctx.read();
    match &guard.transaction {
      Some(tx) => (guard.gateway.clone(), guard.poll, tx.id.clone()),
      None => return Ok(FlowControl::Continue),
    }
  };

  for attempt in 1..=policy.attempts {
    tokio::time::sleep(policy.interval).await;
    let polled = gateway.transaction(&transaction_id).await;
    let mut guard = ctx.write();
    guard.poll_attempts = attempt;
    match polled {
      Ok(transaction) => guard.apply_transaction(transaction),
      Err(e) => {
        warn!(error = %e, attempt, %transaction_id, "Transaction status poll failed.");
        break;
      }
    }
    if guard.status.is_final() || guard.awaiting_bank_redirect() {
      break;
    }
  }

  let guard = ctx.read();
  if guard.status == PaymentStatus::Pending {
    info!(%transaction_id, attempts = guard.poll_attempts, "Payment still pending after polling.");
  }
  Ok(FlowControl::Continue)
}
