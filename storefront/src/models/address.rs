// storefront/src/models/address.rs

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Address {
  pub id: Uuid,
  pub user_id: Uuid,
  pub line1: String,
  pub line2: Option<String>,
  pub city: String,
  pub region: String,
  pub postal_code: Option<String>,
  pub country: String,
  pub phone: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
  pub line1: String,
  pub line2: Option<String>,
  pub city: String,
  pub region: String,
  pub postal_code: Option<String>,
  #[serde(default = "default_country")]
  pub country: String,
  pub phone: Option<String>,
}

fn default_country() -> String {
  "CO".to_string()
}

impl NewAddress {
  pub fn validate(&self) -> Result<()> {
    if self.line1.trim().is_empty() {
      return Err(AppError::Validation("Address line1 is required.".to_string()));
    }
    if self.city.trim().is_empty() || self.region.trim().is_empty() {
      return Err(AppError::Validation("Address city and region are required.".to_string()));
    }
    let country = self.country.trim();
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
      return Err(AppError::Validation(
        "Country must be a two-letter ISO code.".to_string(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn address(country: &str) -> NewAddress {
    NewAddress {
      line1: "Calle 10 # 5-20".into(),
      line2: None,
      city: "Medellín".into(),
      region: "Antioquia".into(),
      postal_code: None,
      country: country.into(),
      phone: None,
    }
  }

  #[test]
  fn country_must_be_iso2() {
    assert!(address("CO").validate().is_ok());
    assert!(address("COL").validate().is_err());
    assert!(address("C1").validate().is_err());
  }

  #[test]
  fn country_defaults_to_colombia() {
    let parsed: NewAddress =
      serde_json::from_str(r#"{"line1":"Cra 7","city":"Bogotá","region":"Cundinamarca"}"#).unwrap();
    assert_eq!(parsed.country, "CO");
  }
}
