// storefront/src/services/signature.rs

//! Gateway checksums: the integrity signature sent with every transaction and
//! the checksum that authenticates incoming events.

use crate::errors::{AppError, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

fn sha256_hex(input: &str) -> String {
  hex::encode(Sha256::digest(input.as_bytes()))
}

/// `sha256(reference + amount_in_cents + currency + integrity_secret)`, hex encoded.
pub fn integrity_signature(reference: &str, amount_in_cents: i64, currency: &str, integrity_secret: &str) -> String {
  sha256_hex(&format!("{}{}{}{}", reference, amount_in_cents, currency, integrity_secret))
}

/// Checksum of an event: the values at `properties` (dot paths under the
/// event's `data` object) concatenated in order, then the timestamp, then the
/// events secret.
pub fn event_checksum(data: &Value, properties: &[String], timestamp: i64, events_secret: &str) -> Result<String> {
  let mut payload = String::new();
  for property in properties {
    let value = property
      .split('.')
      .try_fold(data, |node, key| node.get(key))
      .ok_or_else(|| AppError::Validation(format!("Event is missing signed property '{}'.", property)))?;
    match value {
      Value::String(s) => payload.push_str(s),
      Value::Null => {}
      other => payload.push_str(&other.to_string()),
    }
  }
  payload.push_str(&timestamp.to_string());
  payload.push_str(events_secret);
  Ok(sha256_hex(&payload))
}

/// Compares two hex digests without short-circuiting on the first difference.
pub fn checksums_match(expected: &str, actual: &str) -> bool {
  let a = expected.trim().as_bytes();
  let b = actual.trim().as_bytes();
  if a.len() != b.len() {
    return false;
  }
  a.iter()
    .zip(b)
    .fold(0u8, |acc, (x, y)| acc | (x.to_ascii_lowercase() ^ y.to_ascii_lowercase()))
    == 0
}

/// Compares two secrets through their SHA-256 digests, so the time taken
/// depends neither on where they differ nor on their lengths. An empty
/// expected secret never matches.
pub fn secrets_match(expected: &str, provided: &str) -> bool {
  if expected.is_empty() {
    return false;
  }
  let a = Sha256::digest(expected.as_bytes());
  let b = Sha256::digest(provided.as_bytes());
  a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn integrity_signature_concatenates_in_order() {
    let signature = integrity_signature("sk8-438k4-xmxm392-sn2m", 2_490_000, "COP", "prod_integrity_Z5mMke9x0k8gpErbDqwrJXMqsI6SFli6");
    assert_eq!(
      signature,
      sha256_hex("sk8-438k4-xmxm392-sn2m2490000COPprod_integrity_Z5mMke9x0k8gpErbDqwrJXMqsI6SFli6")
    );
    assert_eq!(signature.len(), 64);
    assert_ne!(signature, integrity_signature("sk8-438k4-xmxm392-sn2m", 2_490_001, "COP", "prod_integrity_Z5mMke9x0k8gpErbDqwrJXMqsI6SFli6"));
  }

  #[test]
  fn event_checksum_reads_nested_properties() {
    let data = json!({
      "transaction": {"id": "1234-1610641025-49201", "status": "APPROVED", "amount_in_cents": 4490000}
    });
    let properties = vec![
      "transaction.id".to_string(),
      "transaction.status".to_string(),
      "transaction.amount_in_cents".to_string(),
    ];
    let checksum = event_checksum(&data, &properties, 1530291411, "prod_events_secret").unwrap();
    assert_eq!(
      checksum,
      sha256_hex("1234-1610641025-49201APPROVED44900001530291411prod_events_secret")
    );
  }

  #[test]
  fn missing_property_is_rejected() {
    let data = json!({"transaction": {"id": "1"}});
    let err = event_checksum(&data, &["transaction.status".to_string()], 1, "s").unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
  }

  #[test]
  fn checksum_comparison_ignores_hex_case() {
    let digest = sha256_hex("abc");
    assert!(checksums_match(&digest, &digest.to_uppercase()));
    assert!(!checksums_match(&digest, &sha256_hex("abd")));
    assert!(!checksums_match(&digest, "short"));
  }

  #[test]
  fn secrets_match_is_exact_and_case_sensitive() {
    assert!(secrets_match("admin-Key-1", "admin-Key-1"));
    assert!(!secrets_match("admin-Key-1", "admin-key-1"));
    assert!(!secrets_match("admin-Key-1", "admin-Key-1 "));
    assert!(!secrets_match("", ""));
  }
}
