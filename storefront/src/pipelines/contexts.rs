// storefront/src/pipelines/contexts.rs

//! Data carried through the flows. Handlers receive these wrapped in
//! `tienda_flow::ContextData`.

use crate::config::PollPolicy;
use crate::models::{NewAddress, Order, PaymentMethod, PaymentStatus, User};
use crate::pipelines::reconcile::{ReconcileOutcome, TransactionUpdate};
use crate::services::gateway::{CardDetails, GatewayTransaction, PaymentGateway, PseDetails};
use crate::state::AppState;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tienda_flow::ContextData;
use uuid::Uuid;

// --- Checkout request ---

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInput {
  pub email: String,
  pub full_name: String,
  pub phone: Option<String>,
  pub legal_id_type: Option<String>,
  pub legal_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CheckoutItemInput {
  pub product_id: Uuid,
  pub quantity: i32,
}

/// `{"method": "card", ...}`, `{"method": "pse", ...}` or `{"method": "nequi", ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentInput {
  Card(CardDetails),
  Pse(PseDetails),
  Nequi { phone_number: String },
}

impl PaymentInput {
  pub fn method(&self) -> PaymentMethod {
    match self {
      PaymentInput::Card(_) => PaymentMethod::Card,
      PaymentInput::Pse(_) => PaymentMethod::Pse,
      PaymentInput::Nequi { .. } => PaymentMethod::Nequi,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
  pub customer: CustomerInput,
  pub shipping_address: NewAddress,
  pub items: Vec<CheckoutItemInput>,
  pub coupon_code: Option<String>,
  pub payment: PaymentInput,
}

// --- Checkout flow ---

#[derive(Clone)]
pub struct CheckoutCtx {
  pub app_state: AppState,
  pub request: CheckoutRequest,
  /// Set when the request carried `X-User-ID`; otherwise a guest customer is used.
  pub authenticated_user_id: Option<Uuid>,
  pub customer: Option<User>,
  pub address_id: Option<Uuid>,
  pub order: Option<Order>,
  pub payment: Option<ContextData<PaymentCtx>>,
  pub outcome: Option<ReconcileOutcome>,
}

impl CheckoutCtx {
  pub fn new(app_state: AppState, request: CheckoutRequest, authenticated_user_id: Option<Uuid>) -> Self {
    Self {
      app_state,
      request,
      authenticated_user_id,
      customer: None,
      address_id: None,
      order: None,
      payment: None,
      outcome: None,
    }
  }

  pub fn payment_method(&self) -> PaymentMethod {
    self.request.payment.method()
  }
}

// --- Provider sub-flows ---

/// Sub-context of the `process_payment` branch. Independent of `AppState` so the
/// provider flows can run against any `PaymentGateway`.
#[derive(Clone)]
pub struct PaymentCtx {
  pub gateway: Arc<dyn PaymentGateway>,
  pub poll: PollPolicy,

  pub instrument: PaymentInput,
  pub amount_in_cents: i64,
  pub currency: String,
  pub reference: String,
  pub customer_email: String,
  pub customer_full_name: String,
  pub customer_phone: Option<String>,
  pub redirect_url: Option<String>,

  pub acceptance_token: Option<String>,
  pub card_token: Option<String>,
  pub transaction: Option<GatewayTransaction>,
  pub status: PaymentStatus,
  pub status_message: Option<String>,
  pub poll_attempts: u32,
  /// Set when a step could not reach the gateway; later steps are skipped.
  pub failure: Option<String>,
}

impl PaymentCtx {
  pub fn method(&self) -> PaymentMethod {
    self.instrument.method()
  }

  pub fn record_failure(&mut self, message: impl Into<String>) {
    let message = message.into();
    self.status = PaymentStatus::Error;
    self.status_message = Some(message.clone());
    self.failure = Some(message);
  }

  pub fn apply_transaction(&mut self, transaction: GatewayTransaction) {
    self.status = transaction.status;
    if transaction.status_message.is_some() {
      self.status_message = transaction.status_message.clone();
    }
    self.transaction = Some(transaction);
  }

  /// PSE asks the customer to finish at the bank; the URL is all checkout needs.
  pub fn awaiting_bank_redirect(&self) -> bool {
    self.method() == PaymentMethod::Pse
      && self
        .transaction
        .as_ref()
        .is_some_and(|tx| tx.async_payment_url.is_some())
  }

  pub fn to_update(&self) -> TransactionUpdate {
    TransactionUpdate {
      reference: self.reference.clone(),
      method: Some(self.method()),
      status: self.status,
      gateway_transaction_id: self.transaction.as_ref().map(|tx| tx.id.clone()),
      redirect_url: self.transaction.as_ref().and_then(|tx| tx.async_payment_url.clone()),
      status_message: self.status_message.clone(),
      amount_cents: self
        .transaction
        .as_ref()
        .map_or(self.amount_in_cents, |tx| tx.amount_in_cents),
    }
  }
}

// --- Gateway events ---

#[derive(Clone)]
pub struct GatewayEventCtx {
  pub app_state: AppState,
  pub body: Value,
  /// `X-Event-Checksum` header, when the gateway sends one.
  pub header_checksum: Option<String>,
  pub event_name: Option<String>,
  pub update: Option<TransactionUpdate>,
  pub outcome: Option<ReconcileOutcome>,
}

impl GatewayEventCtx {
  pub fn new(app_state: AppState, body: Value, header_checksum: Option<String>) -> Self {
    Self {
      app_state,
      body,
      header_checksum,
      event_name: None,
      update: None,
      outcome: None,
    }
  }
}
