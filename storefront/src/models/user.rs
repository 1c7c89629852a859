// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
  Customer,
  Admin,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub email: String,
  pub full_name: String,
  pub phone: Option<String>,
  pub legal_id_type: Option<String>,
  pub legal_id: Option<String>,
  #[serde(skip_serializing)]
  pub password_hash: Option<String>,
  pub role: UserRole,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn is_admin(&self) -> bool {
    self.role == UserRole::Admin
  }

  /// Guest customers are created at checkout and have never set a password.
  pub fn is_guest(&self) -> bool {
    self.password_hash.is_none()
  }
}

/// Lower-cases and trims an e-mail address, rejecting obviously malformed ones.
pub fn normalize_email(raw: &str) -> Option<String> {
  let email = raw.trim().to_lowercase();
  let (local, domain) = email.split_once('@')?;
  if local.is_empty() || domain.len() < 3 || !domain.contains('.') || domain.contains('@') {
    return None;
  }
  Some(email)
}
