// storefront/src/services/http.rs

//! Shared response checks for the gateway and carrier clients.

use crate::errors::{AppError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Vendor error bodies look like `{"error": {"type": "...", "reason": "..."}}`
/// or carry a `messages` object with per-field errors.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
  error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  #[serde(rename = "type")]
  kind: Option<String>,
  reason: Option<String>,
  messages: Option<Value>,
}

/// Returns the response unchanged on success; otherwise reads the body into an
/// `AppError::Gateway` (404 becomes `NotFound`).
pub async fn check_response(resp: reqwest::Response, service: &str) -> Result<reqwest::Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  let detail = describe_error_body(&body);
  if status == reqwest::StatusCode::NOT_FOUND {
    return Err(AppError::NotFound(format!("{}: {}", service, detail)));
  }
  Err(AppError::Gateway(format!("{} answered {}: {}", service, status.as_u16(), detail)))
}

pub(crate) fn describe_error_body(body: &str) -> String {
  match serde_json::from_str::<ErrorEnvelope>(body) {
    Ok(envelope) => {
      let mut parts: Vec<String> = Vec::new();
      if let Some(kind) = envelope.error.kind {
        parts.push(kind);
      }
      if let Some(reason) = envelope.error.reason {
        parts.push(reason);
      }
      if let Some(messages) = envelope.error.messages {
        parts.push(messages.to_string());
      }
      if parts.is_empty() {
        "unknown error".to_string()
      } else {
        parts.join(": ")
      }
    }
    Err(_) if body.trim().is_empty() => "empty response body".to_string(),
    Err(_) => body.chars().take(300).collect(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(status: u16, body: &'static str) -> reqwest::Response {
    reqwest::Response::from(
      ::http::Response::builder()
        .status(status)
        .body(body)
        .unwrap(),
    )
  }

  #[test]
  fn vendor_error_bodies_are_summarized() {
    let body = r#"{"error":{"type":"INPUT_VALIDATION_ERROR","messages":{"number":["invalid"]}}}"#;
    let detail = describe_error_body(body);
    assert!(detail.starts_with("INPUT_VALIDATION_ERROR: "));
    assert!(detail.contains("number"));
    assert_eq!(describe_error_body(""), "empty response body");
    assert_eq!(describe_error_body("Bad Gateway"), "Bad Gateway");
  }

  #[tokio::test]
  async fn non_success_status_becomes_gateway_error() {
    let err = check_response(response(422, r#"{"error":{"type":"X","reason":"y"}}"#), "gateway")
      .await
      .unwrap_err();
    assert!(matches!(err, AppError::Gateway(m) if m.contains("422") && m.contains("X: y")));

    let err = check_response(response(404, ""), "carrier").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert!(check_response(response(200, "{}"), "gateway").await.is_ok());
  }
}
