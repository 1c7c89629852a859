// storefront/src/pipelines/webhook_pipeline.rs

//! Gateway events: verify_event_signature → parse_transaction_event →
//! reconcile_from_event. Only `transaction.updated` is acted on; other events
//! are acknowledged and the flow stops.

use crate::errors::{AppError, Result};
use crate::models::PaymentMethod;
use crate::pipelines::contexts::GatewayEventCtx;
use crate::pipelines::reconcile::{self, TransactionUpdate};
use crate::services::signature::{checksums_match, event_checksum};
use crate::services::wompi::parse_transaction;
use serde_json::Value;
use tienda_flow::{ContextData, Flow, FlowControl, FlowRegistry};
use tracing::{info, instrument, warn};

pub const VERIFY_EVENT_SIGNATURE: &str = "verify_event_signature";
pub const PARSE_TRANSACTION_EVENT: &str = "parse_transaction_event";
pub const RECONCILE_FROM_EVENT: &str = "reconcile_from_event";

pub const TRANSACTION_UPDATED: &str = "transaction.updated";

pub fn register_webhook_pipeline(registry: &FlowRegistry<AppError>) {
  let mut flow = Flow::<GatewayEventCtx, AppError>::new(&[
    (VERIFY_EVENT_SIGNATURE, false, None),
    (PARSE_TRANSACTION_EVENT, false, None),
    (RECONCILE_FROM_EVENT, false, None),
  ]);

  flow.on(VERIFY_EVENT_SIGNATURE, |ctx: ContextData<GatewayEventCtx>| async move {
    let guard = ctx.read();
    verify_event(
      &guard.body,
      guard.header_checksum.as_deref(),
      &guard.app_state.config.gateway.events_secret,
    )?;
    Ok::<_, AppError>(FlowControl::Continue)
  });

  flow.on(PARSE_TRANSACTION_EVENT, |ctx: ContextData<GatewayEventCtx>| async move {
    let mut guard = ctx.write();
    let event_name = guard.body.get("event").and_then(Value::as_str).unwrap_or_default().to_string();
    guard.event_name = Some(event_name.clone());
    if event_name != TRANSACTION_UPDATED {
      info!(event = %event_name, "Acknowledging gateway event without action.");
      return Ok::<_, AppError>(FlowControl::Stop);
    }
    let update = transaction_update(&guard.body)?;
    guard.update = Some(update);
    Ok::<_, AppError>(FlowControl::Continue)
  });

  flow.on(RECONCILE_FROM_EVENT, reconcile_from_event);

  registry.register(flow);
}

/// Checks the event checksum against the events secret. The checksum comes
/// from the body's `signature.checksum`, or the `X-Event-Checksum` header.
pub fn verify_event(body: &Value, header_checksum: Option<&str>, events_secret: &str) -> Result<()> {
  let signature = body
    .get("signature")
    .ok_or_else(|| AppError::Auth("Event carries no signature.".to_string()))?;
  let properties: Vec<String> = signature
    .get("properties")
    .and_then(Value::as_array)
    .ok_or_else(|| AppError::Auth("Event signature lists no properties.".to_string()))?
    .iter()
    .filter_map(|p| p.as_str().map(String::from))
    .collect();
  let timestamp = body
    .get("timestamp")
    .and_then(Value::as_i64)
    .ok_or_else(|| AppError::Auth("Event carries no timestamp.".to_string()))?;
  let provided = header_checksum
    .or_else(|| signature.get("checksum").and_then(Value::as_str))
    .ok_or_else(|| AppError::Auth("Event carries no checksum.".to_string()))?;

  let data = body.get("data").unwrap_or(&Value::Null);
  let computed = event_checksum(data, &properties, timestamp, events_secret)
    .map_err(|e| AppError::Auth(format!("Event signature cannot be computed: {}", e)))?;
  if !checksums_match(provided, &computed) {
    warn!("Gateway event checksum mismatch.");
    return Err(AppError::Auth("Event checksum mismatch.".to_string()));
  }
  Ok(())
}

pub fn transaction_update(body: &Value) -> Result<TransactionUpdate> {
  let raw = body
    .pointer("/data/transaction")
    .ok_or_else(|| AppError::Validation("Event has no transaction.".to_string()))?;
  let transaction = parse_transaction(raw)?;
  Ok(TransactionUpdate {
    method: transaction
      .payment_method_type
      .as_deref()
      .and_then(PaymentMethod::from_gateway),
    reference: transaction.reference,
    status: transaction.status,
    gateway_transaction_id: Some(transaction.id),
    redirect_url: transaction.async_payment_url,
    status_message: transaction.status_message,
    amount_cents: transaction.amount_in_cents,
  })
}

#[instrument(name = "webhook::reconcile_from_event", skip_all)]
async fn reconcile_from_event(ctx: ContextData<GatewayEventCtx>) -> Result<FlowControl> {
  let (pool, update) = {
    let guard = ctx.read();
    let update = guard
      .update
      .clone()
      .ok_or_else(|| AppError::Internal("Reconcile reached without a parsed transaction.".to_string()))?;
    (guard.app_state.db_pool.clone(), update)
  };
  let outcome = reconcile::apply_transaction(&pool, &update).await?;
  if !outcome.changed {
    info!(reference = %outcome.reference, "Gateway event already applied.");
  }
  ctx.write().outcome = Some(outcome);
  Ok(FlowControl::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::PaymentStatus;
  use serde_json::json;
  use sha2::{Digest, Sha256};

  const SECRET: &str = "test_events_secret";

  fn event(status: &str) -> Value {
    let checksum = hex::encode(Sha256::digest(
      format!("tx-77{}5000001718000000{}", status, SECRET).as_bytes(),
    ));
    json!({
      "event": "transaction.updated",
      "data": {
        "transaction": {
          "id": "tx-77",
          "status": status,
          "reference": "TDA-20261018-aaaa",
          "amount_in_cents": 500000,
          "payment_method_type": "NEQUI",
          "status_message": null
        }
      },
      "signature": {
        "properties": ["transaction.id", "transaction.status", "transaction.amount_in_cents"],
        "checksum": checksum
      },
      "timestamp": 1718000000
    })
  }

  #[test]
  fn valid_checksum_is_accepted() {
    assert!(verify_event(&event("APPROVED"), None, SECRET).is_ok());
  }

  #[test]
  fn tampered_event_is_rejected() {
    let mut body = event("DECLINED");
    body["data"]["transaction"]["status"] = json!("APPROVED");
    assert!(matches!(verify_event(&body, None, SECRET), Err(AppError::Auth(_))));
    assert!(matches!(
      verify_event(&event("APPROVED"), None, "other-secret"),
      Err(AppError::Auth(_))
    ));
  }

  #[test]
  fn header_checksum_takes_precedence() {
    assert!(verify_event(&event("APPROVED"), Some("deadbeef"), SECRET).is_err());
  }

  #[test]
  fn transaction_event_becomes_update() {
    let update = transaction_update(&event("APPROVED")).unwrap();
    assert_eq!(update.reference, "TDA-20261018-aaaa");
    assert_eq!(update.status, PaymentStatus::Approved);
    assert_eq!(update.method, Some(PaymentMethod::Nequi));
    assert_eq!(update.gateway_transaction_id.as_deref(), Some("tx-77"));
    assert_eq!(update.amount_cents, 500_000);
  }
}
