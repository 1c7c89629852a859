// storefront/src/services/wompi.rs

//! `PaymentGateway` over the Wompi REST API.

use crate::config::GatewayConfig;
use crate::errors::{AppError, Result};
use crate::models::{PaymentMethod, PaymentStatus};
use crate::services::gateway::{
  AcceptanceToken, CardDetails, ChargeMethod, ChargeRequest, FinancialInstitution, GatewayTransaction, PaymentGateway,
};
use crate::services::http::check_response;
use crate::services::signature::integrity_signature;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const SERVICE: &str = "payment gateway";

/// Every Wompi response wraps its payload in `{"data": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
  data: T,
}

#[derive(Debug, Deserialize)]
struct MerchantData {
  presigned_acceptance: AcceptanceToken,
}

#[derive(Debug, Deserialize)]
struct CardTokenData {
  id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionData {
  id: String,
  status: String,
  status_message: Option<String>,
  reference: String,
  amount_in_cents: i64,
  payment_method_type: Option<String>,
  #[serde(default)]
  payment_method: Option<Value>,
}

impl From<TransactionData> for GatewayTransaction {
  fn from(data: TransactionData) -> Self {
    let async_payment_url = data
      .payment_method
      .as_ref()
      .and_then(|pm| pm.pointer("/extra/async_payment_url"))
      .and_then(Value::as_str)
      .map(String::from);
    GatewayTransaction {
      id: data.id,
      status: PaymentStatus::from_gateway(&data.status),
      status_message: data.status_message,
      reference: data.reference,
      amount_in_cents: data.amount_in_cents,
      payment_method_type: data.payment_method_type,
      async_payment_url,
    }
  }
}

/// Parses a transaction object as found in API responses and webhook events.
pub fn parse_transaction(value: &Value) -> Result<GatewayTransaction> {
  serde_json::from_value::<TransactionData>(value.clone())
    .map(GatewayTransaction::from)
    .map_err(|e| AppError::Validation(format!("Malformed transaction payload: {}", e)))
}

pub struct WompiGateway {
  client: reqwest::Client,
  config: GatewayConfig,
}

impl WompiGateway {
  pub fn new(config: GatewayConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .user_agent(concat!("tienda-storefront/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url, path)
  }

  async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let resp = check_response(resp, SERVICE).await?;
    let envelope: Envelope<T> = resp.json().await?;
    Ok(envelope.data)
  }

  pub(crate) fn transaction_body(&self, request: &ChargeRequest) -> Value {
    let payment_method = match &request.method {
      ChargeMethod::Card { token, installments } => json!({
        "type": PaymentMethod::Card.gateway_type(),
        "token": token,
        "installments": installments,
      }),
      ChargeMethod::Pse { details, description } => json!({
        "type": PaymentMethod::Pse.gateway_type(),
        "user_type": details.user_type,
        "user_legal_id_type": details.user_legal_id_type,
        "user_legal_id": details.user_legal_id,
        "financial_institution_code": details.financial_institution_code,
        "payment_description": description,
      }),
      ChargeMethod::Nequi { phone_number } => json!({
        "type": PaymentMethod::Nequi.gateway_type(),
        "phone_number": phone_number,
      }),
    };

    let mut body = json!({
      "acceptance_token": request.acceptance_token,
      "amount_in_cents": request.amount_in_cents,
      "currency": request.currency,
      "signature": integrity_signature(
        &request.reference,
        request.amount_in_cents,
        &request.currency,
        &self.config.integrity_secret,
      ),
      "customer_email": request.customer_email,
      "reference": request.reference,
      "payment_method": payment_method,
      "customer_data": {
        "full_name": request.customer_full_name,
        "phone_number": request.customer_phone,
      },
    });
    if let Some(redirect_url) = &request.redirect_url {
      body["redirect_url"] = json!(redirect_url);
    }
    body
  }
}

#[async_trait]
impl PaymentGateway for WompiGateway {
  #[instrument(name = "wompi::acceptance_token", skip(self), err(Display))]
  async fn acceptance_token(&self) -> Result<AcceptanceToken> {
    let resp = self
      .client
      .get(self.url(&format!("/merchants/{}", self.config.public_key)))
      .send()
      .await?;
    let merchant: MerchantData = Self::read(resp).await?;
    Ok(merchant.presigned_acceptance)
  }

  #[instrument(name = "wompi::tokenize_card", skip(self, card), fields(last_four = %card.last_four()), err(Display))]
  async fn tokenize_card(&self, card: &CardDetails) -> Result<String> {
    let resp = self
      .client
      .post(self.url("/tokens/cards"))
      .bearer_auth(&self.config.public_key)
      .json(&card_token_body(card))
      .send()
      .await?;
    let token: CardTokenData = Self::read(resp).await?;
    debug!("Card tokenized.");
    Ok(token.id)
  }

  #[instrument(
    name = "wompi::create_transaction",
    skip(self, request),
    fields(reference = %request.reference, amount = request.amount_in_cents),
    err(Display)
  )]
  async fn create_transaction(&self, request: &ChargeRequest) -> Result<GatewayTransaction> {
    let resp = self
      .client
      .post(self.url("/transactions"))
      .bearer_auth(&self.config.private_key)
      .json(&self.transaction_body(request))
      .send()
      .await?;
    let data: TransactionData = Self::read(resp).await?;
    Ok(data.into())
  }

  #[instrument(name = "wompi::transaction", skip(self), err(Display))]
  async fn transaction(&self, id: &str) -> Result<GatewayTransaction> {
    let resp = self
      .client
      .get(self.url(&format!("/transactions/{}", id)))
      .bearer_auth(&self.config.public_key)
      .send()
      .await?;
    let data: TransactionData = Self::read(resp).await?;
    Ok(data.into())
  }

  #[instrument(name = "wompi::financial_institutions", skip(self), err(Display))]
  async fn financial_institutions(&self) -> Result<Vec<FinancialInstitution>> {
    let resp = self
      .client
      .get(self.url("/pse/financial_institutions"))
      .bearer_auth(&self.config.public_key)
      .send()
      .await?;
    Self::read(resp).await
  }
}

fn card_token_body(card: &CardDetails) -> Value {
  json!({
    "number": card.digits(),
    "cvc": card.cvc.trim(),
    "exp_month": card.exp_month.trim(),
    "exp_year": card.exp_year.trim(),
    "card_holder": card.card_holder.trim(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::gateway::PseDetails;

  fn gateway() -> WompiGateway {
    WompiGateway::new(GatewayConfig {
      base_url: "https://sandbox.example.test/v1".into(),
      public_key: "pub_test_1".into(),
      private_key: "prv_test_1".into(),
      integrity_secret: "test_integrity_1".into(),
      events_secret: "test_events_1".into(),
      pse_redirect_url: None,
    })
    .unwrap()
  }

  fn request(method: ChargeMethod) -> ChargeRequest {
    ChargeRequest {
      amount_in_cents: 4_490_000,
      currency: "COP".into(),
      customer_email: "ana@example.com".into(),
      customer_full_name: "Ana Pérez".into(),
      customer_phone: Some("3001234567".into()),
      reference: "TDA-20261018-abc".into(),
      acceptance_token: "acc_tok".into(),
      method,
      redirect_url: Some("https://tienda.example/pse/return".into()),
    }
  }

  #[test]
  fn transaction_body_is_signed_and_typed() {
    let gw = gateway();
    let body = gw.transaction_body(&request(ChargeMethod::Card {
      token: "tok_test_1".into(),
      installments: 3,
    }));
    assert_eq!(body["payment_method"]["type"], "CARD");
    assert_eq!(body["payment_method"]["installments"], 3);
    assert_eq!(body["amount_in_cents"], 4_490_000);
    assert_eq!(
      body["signature"],
      integrity_signature("TDA-20261018-abc", 4_490_000, "COP", "test_integrity_1")
    );
    assert_eq!(body["redirect_url"], "https://tienda.example/pse/return");

    let body = gw.transaction_body(&request(ChargeMethod::Pse {
      details: PseDetails {
        user_type: 0,
        user_legal_id_type: "CC".into(),
        user_legal_id: "1099888777".into(),
        financial_institution_code: "1022".into(),
      },
      description: "Pedido TDA-20261018-abc".into(),
    }));
    assert_eq!(body["payment_method"]["type"], "PSE");
    assert_eq!(body["payment_method"]["financial_institution_code"], "1022");

    let body = gw.transaction_body(&request(ChargeMethod::Nequi {
      phone_number: "3107654321".into(),
    }));
    assert_eq!(body["payment_method"]["phone_number"], "3107654321");
  }

  #[test]
  fn card_token_body_sends_compact_digits() {
    let card = CardDetails {
      number: "4242 4242 4242 4242".into(),
      cvc: " 123 ".into(),
      exp_month: "08".into(),
      exp_year: "29".into(),
      card_holder: "Ana Pérez".into(),
      installments: 1,
    };
    let body = card_token_body(&card);
    assert_eq!(body["number"], "4242424242424242");
    assert_eq!(body["cvc"], "123");
  }

  #[test]
  fn transaction_payload_maps_status_and_async_url() {
    let raw = json!({
      "id": "1234-1610641025-49201",
      "status": "PENDING",
      "status_message": null,
      "reference": "TDA-1",
      "amount_in_cents": 100_000,
      "payment_method_type": "PSE",
      "payment_method": {"type": "PSE", "extra": {"async_payment_url": "https://bank.example/pay"}}
    });
    let tx = parse_transaction(&raw).unwrap();
    assert_eq!(tx.status, PaymentStatus::Pending);
    assert_eq!(tx.async_payment_url.as_deref(), Some("https://bank.example/pay"));

    let raw = json!({"id": "1", "status": "WEIRD", "reference": "TDA-2", "amount_in_cents": 1});
    let tx = parse_transaction(&raw).unwrap();
    assert_eq!(tx.status, PaymentStatus::Error);
    assert!(tx.async_payment_url.is_none());

    assert!(parse_transaction(&json!({"id": 5})).is_err());
  }
}
