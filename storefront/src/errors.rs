// storefront/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tienda_flow::FlowError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  /// The payment gateway answered with an error payload.
  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  /// Transport-level failure talking to the gateway or a carrier.
  #[error("Upstream HTTP Error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl AppError {
  /// Maps a unique-constraint violation to `Conflict`, everything else stays a database error.
  pub fn from_unique_violation(err: sqlx::Error, message: impl Into<String>) -> Self {
    match &err {
      sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict(message.into()),
      _ => AppError::Sqlx(err),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::Gateway(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    let body = match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m)
      | AppError::Payment(m) => json!({ "error": m }),
      AppError::Gateway(m) => json!({ "error": "Payment provider error", "detail": m }),
      AppError::Http(_) => json!({ "error": "Upstream service unavailable" }),
      AppError::Config(m) => json!({ "error": "Configuration issue", "detail": m }),
      AppError::Sqlx(_) => json!({ "error": "Database operation failed" }),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        json!({ "error": "Workflow processing error", "detail": source.to_string() })
      }
      AppError::Internal(m) => json!({ "error": "An internal error occurred", "detail": m }),
    };
    HttpResponse::build(self.status_code()).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes_follow_error_kind() {
    assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
    assert_eq!(AppError::Payment("x".into()).status_code(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(AppError::Gateway("x".into()).status_code(), StatusCode::BAD_GATEWAY);
    let flow_err: AppError = FlowError::NoBranchMatched {
      step_name: "process_payment".into(),
    }
    .into();
    assert_eq!(flow_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn anyhow_wrapping_sqlx_keeps_database_variant() {
    let err: AppError = anyhow::Error::new(sqlx::Error::RowNotFound).into();
    assert!(matches!(err, AppError::Sqlx(sqlx::Error::RowNotFound)));

    let err: AppError = anyhow::anyhow!("boom").into();
    assert!(matches!(err, AppError::Internal(m) if m == "boom"));
  }
}
