// storefront/tests/payment_flow_tests.rs

use async_trait::async_trait;
use serial_test::serial;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storefront::config::PollPolicy;
use storefront::errors::{AppError, Result};
use storefront::models::{PaymentMethod, PaymentStatus};
use storefront::pipelines::contexts::{PaymentCtx, PaymentInput};
use storefront::pipelines::payment_flows::{card_flow, nequi_flow, pse_flow};
use storefront::services::gateway::{
  AcceptanceToken, CardDetails, ChargeMethod, ChargeRequest, FinancialInstitution, GatewayTransaction, PaymentGateway,
  PseDetails,
};
use tienda_flow::{ContextData, FlowOutcome};

/// In-memory gateway: answers polls from a script and records every call.
#[derive(Default)]
struct ScriptedGateway {
  acceptance_down: bool,
  reject_card: bool,
  charge_status: Option<PaymentStatus>,
  async_payment_url: Option<String>,
  polls: Mutex<VecDeque<Result<PaymentStatus>>>,
  calls: Mutex<Vec<String>>,
  charges: Mutex<Vec<ChargeRequest>>,
}

impl ScriptedGateway {
  fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  fn record(&self, call: &str) {
    self.calls.lock().unwrap().push(call.to_string());
  }

  fn transaction(&self, status: PaymentStatus) -> GatewayTransaction {
    GatewayTransaction {
      id: "tx-100".into(),
      status,
      status_message: None,
      reference: "TDA-TEST".into(),
      amount_in_cents: 250_000,
      payment_method_type: None,
      async_payment_url: self.async_payment_url.clone(),
    }
  }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
  async fn acceptance_token(&self) -> Result<AcceptanceToken> {
    self.record("acceptance_token");
    if self.acceptance_down {
      return Err(AppError::Gateway("merchant lookup failed".into()));
    }
    Ok(AcceptanceToken {
      acceptance_token: "acc-token".into(),
      permalink: "https://example.test/terms.pdf".into(),
    })
  }

  async fn tokenize_card(&self, _card: &CardDetails) -> Result<String> {
    self.record("tokenize_card");
    if self.reject_card {
      return Err(AppError::Gateway("card number is invalid".into()));
    }
    Ok("tok_test_123".into())
  }

  async fn create_transaction(&self, request: &ChargeRequest) -> Result<GatewayTransaction> {
    self.record("create_transaction");
    self.charges.lock().unwrap().push(request.clone());
    Ok(self.transaction(self.charge_status.unwrap_or(PaymentStatus::Pending)))
  }

  async fn transaction(&self, _id: &str) -> Result<GatewayTransaction> {
    self.record("transaction");
    let next = self.polls.lock().unwrap().pop_front().unwrap_or(Ok(PaymentStatus::Pending));
    next.map(|status| self.transaction(status))
  }

  async fn financial_institutions(&self) -> Result<Vec<FinancialInstitution>> {
    Ok(vec![])
  }
}

fn payment_ctx(gateway: Arc<ScriptedGateway>, instrument: PaymentInput) -> ContextData<PaymentCtx> {
  ContextData::new(PaymentCtx {
    gateway,
    poll: PollPolicy {
      attempts: 3,
      interval: Duration::from_millis(1),
    },
    instrument,
    amount_in_cents: 250_000,
    currency: "COP".into(),
    reference: "TDA-TEST".into(),
    customer_email: "ana@example.com".into(),
    customer_full_name: "Ana Pérez".into(),
    customer_phone: None,
    redirect_url: None,
    acceptance_token: None,
    card_token: None,
    transaction: None,
    status: PaymentStatus::Pending,
    status_message: None,
    poll_attempts: 0,
    failure: None,
  })
}

fn card() -> PaymentInput {
  PaymentInput::Card(CardDetails {
    number: "4242424242424242".into(),
    cvc: "123".into(),
    exp_month: "08".into(),
    exp_year: "29".into(),
    card_holder: "Ana Pérez".into(),
    installments: 2,
  })
}

fn polls(script: Vec<Result<PaymentStatus>>) -> Mutex<VecDeque<Result<PaymentStatus>>> {
  Mutex::new(script.into())
}

#[tokio::test]
#[serial]
async fn card_payment_is_tokenized_charged_and_polled_until_approved() {
  let gateway = Arc::new(ScriptedGateway {
    polls: polls(vec![Ok(PaymentStatus::Pending), Ok(PaymentStatus::Approved)]),
    ..Default::default()
  });
  let ctx = payment_ctx(gateway.clone(), card());

  let outcome = card_flow().run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Completed);
  assert_eq!(
    gateway.calls(),
    vec!["acceptance_token", "tokenize_card", "create_transaction", "transaction", "transaction"]
  );
  let guard = ctx.read();
  assert_eq!(guard.status, PaymentStatus::Approved);
  assert_eq!(guard.poll_attempts, 2);
  assert_eq!(guard.card_token.as_deref(), Some("tok_test_123"));

  let charges = gateway.charges.lock().unwrap();
  assert_eq!(charges[0].acceptance_token, "acc-token");
  match &charges[0].method {
    ChargeMethod::Card { token, installments } => {
      assert_eq!(token, "tok_test_123");
      assert_eq!(*installments, 2);
    }
    other => panic!("unexpected charge method {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn rejected_card_skips_charge_and_records_error() {
  let gateway = Arc::new(ScriptedGateway {
    reject_card: true,
    ..Default::default()
  });
  let ctx = payment_ctx(gateway.clone(), card());

  card_flow().run(ctx.clone()).await.unwrap();

  assert_eq!(gateway.calls(), vec!["acceptance_token", "tokenize_card"]);
  let guard = ctx.read();
  assert_eq!(guard.status, PaymentStatus::Error);
  assert!(guard.failure.as_deref().unwrap().contains("card number is invalid"));
  assert!(guard.transaction.is_none());

  let update = guard.to_update();
  assert_eq!(update.status, PaymentStatus::Error);
  assert_eq!(update.method, Some(PaymentMethod::Card));
  assert!(update.gateway_transaction_id.is_none());
}

#[tokio::test]
#[serial]
async fn gateway_outage_before_charge_fails_the_payment() {
  let gateway = Arc::new(ScriptedGateway {
    acceptance_down: true,
    ..Default::default()
  });
  let ctx = payment_ctx(gateway.clone(), PaymentInput::Nequi {
    phone_number: "3107654321".into(),
  });

  nequi_flow().run(ctx.clone()).await.unwrap();

  assert_eq!(gateway.calls(), vec!["acceptance_token"]);
  assert_eq!(ctx.read().status, PaymentStatus::Error);
}

#[tokio::test]
#[serial]
async fn pse_stops_polling_once_bank_url_is_known() {
  let gateway = Arc::new(ScriptedGateway {
    async_payment_url: Some("https://bank.example.test/pay/123".into()),
    ..Default::default()
  });
  let ctx = payment_ctx(gateway.clone(), PaymentInput::Pse(PseDetails {
    user_type: 0,
    user_legal_id_type: "CC".into(),
    user_legal_id: "1099888777".into(),
    financial_institution_code: "1022".into(),
  }));

  pse_flow().run(ctx.clone()).await.unwrap();

  assert_eq!(gateway.calls(), vec!["acceptance_token", "create_transaction"]);
  let guard = ctx.read();
  assert_eq!(guard.status, PaymentStatus::Pending);
  assert!(guard.awaiting_bank_redirect());
  assert_eq!(guard.to_update().redirect_url.as_deref(), Some("https://bank.example.test/pay/123"));
}

#[tokio::test]
#[serial]
async fn nequi_gives_up_after_the_poll_budget() {
  let gateway = Arc::new(ScriptedGateway::default());
  let ctx = payment_ctx(gateway.clone(), PaymentInput::Nequi {
    phone_number: "3107654321".into(),
  });

  nequi_flow().run(ctx.clone()).await.unwrap();

  let polls = gateway.calls().iter().filter(|c| *c == "transaction").count();
  assert_eq!(polls, 3);
  let guard = ctx.read();
  assert_eq!(guard.status, PaymentStatus::Pending);
  assert_eq!(guard.poll_attempts, 3);
  assert!(guard.failure.is_none());
}

#[tokio::test]
#[serial]
async fn poll_error_leaves_payment_pending() {
  let gateway = Arc::new(ScriptedGateway {
    polls: polls(vec![Err(AppError::Gateway("timeout".into()))]),
    ..Default::default()
  });
  let ctx = payment_ctx(gateway.clone(), PaymentInput::Nequi {
    phone_number: "3107654321".into(),
  });

  let outcome = nequi_flow().run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Completed);
  assert_eq!(gateway.calls().iter().filter(|c| *c == "transaction").count(), 1);
  assert_eq!(ctx.read().status, PaymentStatus::Pending);
}

#[tokio::test]
#[serial]
async fn declined_charge_is_final_without_polling() {
  let gateway = Arc::new(ScriptedGateway {
    charge_status: Some(PaymentStatus::Declined),
    ..Default::default()
  });
  let ctx = payment_ctx(gateway.clone(), card());

  card_flow().run(ctx.clone()).await.unwrap();

  assert!(!gateway.calls().contains(&"transaction".to_string()));
  assert_eq!(ctx.read().status, PaymentStatus::Declined);
}
