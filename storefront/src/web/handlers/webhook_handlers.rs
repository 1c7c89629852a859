// storefront/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::GatewayEventCtx;
use crate::state::AppState;
use tienda_flow::{ContextData, FlowOutcome};

pub const EVENT_CHECKSUM_HEADER: &str = "X-Event-Checksum";

/// Gateway event receiver. Unhandled event types are acknowledged with 200 so
/// the gateway does not retry them; a bad checksum answers 401.
#[instrument(name = "handler::gateway_event", skip_all, fields(event = ?body.get("event")))]
pub async fn gateway_event_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let header_checksum = req
    .headers()
    .get(EVENT_CHECKSUM_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(String::from);

  let ctx = ContextData::new(GatewayEventCtx::new(
    app_state.get_ref().clone(),
    body.into_inner(),
    header_checksum,
  ));

  let outcome = app_state.flows.run(ctx.clone()).await.inspect_err(|e| {
    warn!(error = %e, "Gateway event processing failed.");
  })?;

  let guard = ctx.read();
  match (outcome, guard.outcome.as_ref()) {
    (FlowOutcome::Completed, Some(reconciled)) => {
      info!(
        reference = %reconciled.reference,
        order_status = %reconciled.order_status,
        changed = reconciled.changed,
        "Gateway event applied."
      );
      Ok(HttpResponse::Ok().json(json!({
        "received": true,
        "reference": reconciled.reference,
        "order_status": reconciled.order_status,
        "payment_status": reconciled.payment_status,
        "changed": reconciled.changed,
        "needs_review": reconciled.needs_review,
      })))
    }
    _ => Ok(HttpResponse::Ok().json(json!({ "received": true, "event": guard.event_name }))),
  }
}
