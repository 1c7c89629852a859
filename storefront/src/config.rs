// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://sandbox.wompi.co/v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub run_migrations: bool,
  pub admin_api_key: String,

  pub gateway: GatewayConfig,
  pub payment_poll: PollPolicy,

  pub shipping_api_base_url: String,
  pub shipping_api_key: Option<String>,

  pub store_currency: String,
  pub free_shipping_threshold_cents: i64,
  pub flat_shipping_cents: i64,
  pub low_stock_threshold: i32,
  pub monthly_revenue_goal_cents: i64,
}

#[derive(Clone)]
pub struct GatewayConfig {
  pub base_url: String,
  pub public_key: String,
  pub private_key: String,
  pub integrity_secret: String,
  pub events_secret: String,
  /// Where PSE sends the customer back after the bank step.
  pub pse_redirect_url: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GatewayConfig")
      .field("base_url", &self.base_url)
      .field("public_key", &self.public_key)
      .field("private_key", &"[REDACTED]")
      .field("integrity_secret", &"[REDACTED]")
      .field("events_secret", &"[REDACTED]")
      .field("pse_redirect_url", &self.pse_redirect_url)
      .finish()
  }
}

/// How long checkout waits on the gateway for a final transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
  pub attempts: u32,
  pub interval: Duration,
}

impl Default for PollPolicy {
  fn default() -> Self {
    Self {
      attempts: 5,
      interval: Duration::from_millis(1000),
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    let config = Self::from_lookup(|key| env::var(key).ok())?;
    tracing::info!(
      server_host = %config.server_host,
      server_port = config.server_port,
      gateway = %config.gateway.base_url,
      "Application configuration loaded successfully."
    );
    Ok(config)
  }

  pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
    Self::from_lookup(|key| vars.get(key).cloned())
  }

  /// Builds the configuration from any key lookup; `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let required = |name: &str| {
      lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", name)))
    };
    let or_default = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

    let server_host = or_default("SERVER_HOST", "127.0.0.1");
    let server_port: u16 = parse_var("SERVER_PORT", &or_default("SERVER_PORT", "8080"))?;
    let database_url = required("DATABASE_URL")?;
    let run_migrations: bool = parse_var("RUN_MIGRATIONS", &or_default("RUN_MIGRATIONS", "true"))?;
    let admin_api_key = required("ADMIN_API_KEY")?;

    let gateway = GatewayConfig {
      base_url: or_default("GATEWAY_BASE_URL", DEFAULT_GATEWAY_BASE_URL)
        .trim_end_matches('/')
        .to_string(),
      public_key: or_default("GATEWAY_PUBLIC_KEY", ""),
      private_key: or_default("GATEWAY_PRIVATE_KEY", ""),
      integrity_secret: or_default("GATEWAY_INTEGRITY_SECRET", ""),
      events_secret: or_default("GATEWAY_EVENTS_SECRET", ""),
      pse_redirect_url: lookup("PSE_REDIRECT_URL").filter(|v| !v.is_empty()),
    };

    let poll_attempts: u32 = parse_var("PAYMENT_POLL_ATTEMPTS", &or_default("PAYMENT_POLL_ATTEMPTS", "5"))?;
    let poll_interval_ms: u64 = parse_var("PAYMENT_POLL_INTERVAL_MS", &or_default("PAYMENT_POLL_INTERVAL_MS", "1000"))?;

    let free_shipping_threshold_cents: i64 = parse_var("FREE_SHIPPING_THRESHOLD_CENTS", &or_default("FREE_SHIPPING_THRESHOLD_CENTS", "20000000"))?;
    let flat_shipping_cents: i64 = parse_var("FLAT_SHIPPING_CENTS", &or_default("FLAT_SHIPPING_CENTS", "1500000"))?;
    if free_shipping_threshold_cents < 0 || flat_shipping_cents < 0 {
      return Err(AppError::Config("Shipping amounts cannot be negative".to_string()));
    }

    let store_currency = or_default("STORE_CURRENCY", "COP").trim().to_uppercase();
    if store_currency.len() != 3 || !store_currency.chars().all(|c| c.is_ascii_alphabetic()) {
      return Err(AppError::Config(format!(
        "STORE_CURRENCY must be a three-letter ISO 4217 code, got '{}'",
        store_currency
      )));
    }

    Ok(Self {
      server_host,
      server_port,
      database_url,
      run_migrations,
      admin_api_key,
      gateway,
      payment_poll: PollPolicy {
        attempts: poll_attempts,
        interval: Duration::from_millis(poll_interval_ms),
      },
      shipping_api_base_url: or_default("SHIPPING_API_BASE_URL", "http://127.0.0.1:9090")
        .trim_end_matches('/')
        .to_string(),
      shipping_api_key: lookup("SHIPPING_API_KEY").filter(|v| !v.is_empty()),
      store_currency,
      free_shipping_threshold_cents,
      flat_shipping_cents,
      low_stock_threshold: parse_var("LOW_STOCK_THRESHOLD", &or_default("LOW_STOCK_THRESHOLD", "5"))?,
      monthly_revenue_goal_cents: parse_var("MONTHLY_REVENUE_GOAL_CENTS", &or_default("MONTHLY_REVENUE_GOAL_CENTS", "0"))?,
    })
  }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base_vars() -> HashMap<String, String> {
    HashMap::from([
      ("DATABASE_URL".to_string(), "postgres://localhost/tienda".to_string()),
      ("ADMIN_API_KEY".to_string(), "secret-admin".to_string()),
    ])
  }

  #[test]
  fn defaults_apply_when_optional_vars_are_absent() {
    let config = AppConfig::from_map(&base_vars()).unwrap();
    assert_eq!(config.server_port, 8080);
    assert_eq!(config.store_currency, "COP");
    assert_eq!(config.gateway.base_url, DEFAULT_GATEWAY_BASE_URL);
    assert_eq!(config.payment_poll, PollPolicy::default());
    assert_eq!(config.low_stock_threshold, 5);
    assert!(config.run_migrations);
  }

  #[test]
  fn missing_required_var_is_a_config_error() {
    let mut vars = base_vars();
    vars.remove("ADMIN_API_KEY");
    let err = AppConfig::from_map(&vars).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("ADMIN_API_KEY")));
  }

  #[test]
  fn invalid_number_is_a_config_error() {
    let mut vars = base_vars();
    vars.insert("PAYMENT_POLL_ATTEMPTS".into(), "many".into());
    assert!(matches!(AppConfig::from_map(&vars), Err(AppError::Config(_))));
  }

  #[test]
  fn store_currency_must_be_a_three_letter_code() {
    let mut vars = base_vars();
    vars.insert("STORE_CURRENCY".into(), " usd ".into());
    assert_eq!(AppConfig::from_map(&vars).unwrap().store_currency, "USD");

    for bad in ["PESO", "CO", "C0P", ""] {
      vars.insert("STORE_CURRENCY".into(), bad.into());
      assert!(
        matches!(AppConfig::from_map(&vars), Err(AppError::Config(m)) if m.contains("STORE_CURRENCY")),
        "{}",
        bad
      );
    }
  }

  #[test]
  fn gateway_secrets_are_redacted_in_debug_output() {
    let mut vars = base_vars();
    vars.insert("GATEWAY_PRIVATE_KEY".into(), "prv_test_abc".into());
    let config = AppConfig::from_map(&vars).unwrap();
    assert!(!format!("{:?}", config).contains("prv_test_abc"));
  }
}
