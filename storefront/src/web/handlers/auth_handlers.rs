// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::db::users::{self, UserProfile};
use crate::errors::AppError;
use crate::models::normalize_email;
use crate::services::auth_service;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  pub full_name: String,
  pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let email = normalize_email(&payload.email)
    .ok_or_else(|| AppError::Validation("A valid e-mail address is required.".to_string()))?;
  let full_name = payload.full_name.trim().to_string();
  if full_name.is_empty() {
    return Err(AppError::Validation("Full name is required.".to_string()));
  }
  auth_service::validate_new_password(&payload.password)?;
  let password_hash = auth_service::hash_password(&payload.password)?;

  let profile = UserProfile {
    email,
    full_name,
    phone: payload.phone.filter(|p| !p.trim().is_empty()),
    legal_id_type: None,
    legal_id: None,
  };
  let user = users::create_customer(&app_state.db_pool, &profile, &password_hash).await?;
  info!(user_id = %user.id, "Customer signed up.");
  Ok(HttpResponse::Created().json(user))
}

#[instrument(name = "handler::signin", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let invalid = || AppError::Auth("Invalid e-mail or password.".to_string());
  let email = normalize_email(&req_payload.email).ok_or_else(invalid)?;

  let user = users::find_by_email(&app_state.db_pool, &email).await?.ok_or_else(invalid)?;
  let Some(stored_hash) = user.password_hash.as_deref() else {
    warn!(user_id = %user.id, "Sign-in attempted on a guest account.");
    return Err(invalid());
  };
  if !auth_service::verify_password(stored_hash, &req_payload.password)? {
    warn!(user_id = %user.id, "Sign-in failed: wrong password.");
    return Err(invalid());
  }

  info!(user_id = %user.id, "Customer signed in.");
  Ok(HttpResponse::Ok().json(user))
}
