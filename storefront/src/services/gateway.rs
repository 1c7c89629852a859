// storefront/src/services/gateway.rs

//! Provider-neutral view of the payment gateway.

use crate::errors::Result;
use crate::models::PaymentStatus;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

/// Raw card data. Only ever forwarded to the tokenization endpoint.
#[derive(Clone, Deserialize)]
pub struct CardDetails {
  #[serde(deserialize_with = "compact_card_number")]
  pub number: String,
  pub cvc: String,
  pub exp_month: String,
  pub exp_year: String,
  pub card_holder: String,
  #[serde(default = "one_installment")]
  pub installments: u32,
}

fn one_installment() -> u32 {
  1
}

/// Card numbers are accepted with grouping spaces and stored without them.
fn compact_card_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
  let raw = String::deserialize(deserializer)?;
  Ok(raw.chars().filter(|c| !c.is_whitespace()).collect())
}

impl CardDetails {
  /// The number with every whitespace character removed; what validation checks and the gateway receives.
  pub fn digits(&self) -> String {
    self.number.chars().filter(|c| !c.is_whitespace()).collect()
  }

  pub fn last_four(&self) -> String {
    let mut tail: Vec<char> = self.number.chars().filter(|c| !c.is_whitespace()).rev().take(4).collect();
    tail.reverse();
    tail.into_iter().collect()
  }
}

impl std::fmt::Debug for CardDetails {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CardDetails")
      .field("number", &format_args!("****{}", self.last_four()))
      .field("cvc", &"***")
      .field("exp_month", &self.exp_month)
      .field("exp_year", &self.exp_year)
      .field("installments", &self.installments)
      .finish()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PseDetails {
  /// 0 for natural persons, 1 for companies.
  #[serde(default)]
  pub user_type: u8,
  pub user_legal_id_type: String,
  pub user_legal_id: String,
  pub financial_institution_code: String,
}

#[derive(Debug, Clone)]
pub enum ChargeMethod {
  Card { token: String, installments: u32 },
  Pse { details: PseDetails, description: String },
  Nequi { phone_number: String },
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
  pub amount_in_cents: i64,
  pub currency: String,
  pub customer_email: String,
  pub customer_full_name: String,
  pub customer_phone: Option<String>,
  pub reference: String,
  pub acceptance_token: String,
  pub method: ChargeMethod,
  pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceToken {
  pub acceptance_token: String,
  pub permalink: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayTransaction {
  pub id: String,
  pub status: PaymentStatus,
  pub status_message: Option<String>,
  pub reference: String,
  pub amount_in_cents: i64,
  pub payment_method_type: Option<String>,
  /// Bank URL the customer must visit to finish a PSE payment.
  pub async_payment_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinancialInstitution {
  pub financial_institution_code: String,
  pub financial_institution_name: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn acceptance_token(&self) -> Result<AcceptanceToken>;

  /// Exchanges card data for a single-use token.
  async fn tokenize_card(&self, card: &CardDetails) -> Result<String>;

  async fn create_transaction(&self, request: &ChargeRequest) -> Result<GatewayTransaction>;

  async fn transaction(&self, id: &str) -> Result<GatewayTransaction>;

  /// Banks available for PSE.
  async fn financial_institutions(&self) -> Result<Vec<FinancialInstitution>>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn card_debug_output_hides_number_and_cvc() {
    let card = CardDetails {
      number: "4242424242424242".into(),
      cvc: "789".into(),
      exp_month: "08".into(),
      exp_year: "28".into(),
      card_holder: "Ana Pérez".into(),
      installments: 1,
    };
    let debug = format!("{:?}", card);
    assert!(debug.contains("****4242"));
    assert!(!debug.contains("4242424242424242"));
    assert!(!debug.contains("789"));
  }

  #[test]
  fn last_four_handles_grouped_and_unicode_spaced_numbers() {
    let mut card: CardDetails = serde_json::from_value(serde_json::json!({
      "number": "4242 4242 4242 4242",
      "cvc": "123",
      "exp_month": "08",
      "exp_year": "29",
      "card_holder": "Ana Pérez"
    }))
    .unwrap();
    assert_eq!(card.number, "4242424242424242");
    assert_eq!(card.last_four(), "4242");

    card.number = "4242424242424242\u{3000}42".into();
    assert_eq!(card.last_four(), "4242");
    assert_eq!(card.digits(), "424242424242424242");

    card.number = "42".into();
    assert_eq!(card.last_four(), "42");
  }
}
