// storefront/src/db/users.rs

use crate::errors::{AppError, Result};
use crate::models::{User, UserRole};
use sqlx::PgExecutor;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str =
  "id, email, full_name, phone, legal_id_type, legal_id, password_hash, role, created_at, updated_at";

/// Fields written when a user is created or a guest profile is refreshed.
#[derive(Debug, Clone)]
pub struct UserProfile {
  pub email: String,
  pub full_name: String,
  pub phone: Option<String>,
  pub legal_id_type: Option<String>,
  pub legal_id: Option<String>,
}

pub async fn find<'e>(ex: impl PgExecutor<'e>, id: Uuid) -> Result<User> {
  let sql = format!("SELECT {} FROM users WHERE id = $1", COLUMNS);
  sqlx::query_as::<_, User>(&sql)
    .bind(id)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", id)))
}

pub async fn find_by_email<'e>(ex: impl PgExecutor<'e>, email: &str) -> Result<Option<User>> {
  let sql = format!("SELECT {} FROM users WHERE email = $1", COLUMNS);
  Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(ex).await?)
}

/// Registers a customer with a password. A guest row with the same e-mail is
/// claimed; an account that already has a password is a conflict.
#[instrument(name = "db::users::create_customer", skip(ex, profile, password_hash), fields(email = %profile.email))]
pub async fn create_customer<'e>(ex: impl PgExecutor<'e>, profile: &UserProfile, password_hash: &str) -> Result<User> {
  let sql = format!(
    "INSERT INTO users (id, email, full_name, phone, legal_id_type, legal_id, password_hash, role) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, 'customer') \
     ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash, full_name = EXCLUDED.full_name, \
       phone = COALESCE(EXCLUDED.phone, users.phone), updated_at = now() \
     WHERE users.password_hash IS NULL \
     RETURNING {}",
    COLUMNS
  );
  sqlx::query_as::<_, User>(&sql)
    .bind(Uuid::new_v4())
    .bind(&profile.email)
    .bind(&profile.full_name)
    .bind(profile.phone.as_deref())
    .bind(profile.legal_id_type.as_deref())
    .bind(profile.legal_id.as_deref())
    .bind(password_hash)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("An account for {} already exists.", profile.email)))
}

/// Finds the user by e-mail or creates a guest customer (no password).
/// Contact details given at checkout refresh an existing guest row only; a
/// registered account is never touched by an anonymous checkout.
#[instrument(name = "db::users::upsert_guest", skip(ex, profile), fields(email = %profile.email))]
pub async fn upsert_guest<'e>(ex: impl PgExecutor<'e>, profile: &UserProfile) -> Result<User> {
  let sql = format!(
    "INSERT INTO users (id, email, full_name, phone, legal_id_type, legal_id, role) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) \
     ON CONFLICT (email) DO UPDATE SET \
       full_name = EXCLUDED.full_name, \
       phone = COALESCE(EXCLUDED.phone, users.phone), \
       legal_id_type = COALESCE(EXCLUDED.legal_id_type, users.legal_id_type), \
       legal_id = COALESCE(EXCLUDED.legal_id, users.legal_id), \
       updated_at = now() \
     WHERE users.password_hash IS NULL \
     RETURNING {}",
    COLUMNS
  );
  sqlx::query_as::<_, User>(&sql)
    .bind(Uuid::new_v4())
    .bind(&profile.email)
    .bind(&profile.full_name)
    .bind(profile.phone.as_deref())
    .bind(profile.legal_id_type.as_deref())
    .bind(profile.legal_id.as_deref())
    .bind(UserRole::Customer)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| registered_account(&profile.email))
}

fn registered_account(email: &str) -> AppError {
  AppError::Auth(format!("An account exists for {}. Sign in to check out.", email))
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::ResponseError;

  #[test]
  fn anonymous_checkout_for_a_registered_email_needs_sign_in() {
    let err = registered_account("ana@example.com");
    assert!(matches!(err, AppError::Auth(_)));
    assert_eq!(err.status_code(), actix_web::http::StatusCode::UNAUTHORIZED);
    assert!(err.to_string().contains("Sign in"));
  }
}
