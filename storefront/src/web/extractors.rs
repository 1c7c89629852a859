// storefront/src/web/extractors.rs

//! Request identity. Customers are identified by `X-User-ID`; admin routes
//! require `X-Admin-Key` to match the configured key.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::signature::secrets_match;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

fn user_id_from(req: &HttpRequest) -> Result<Option<Uuid>, AppError> {
  let Some(raw) = req.headers().get(USER_ID_HEADER) else {
    return Ok(None);
  };
  raw
    .to_str()
    .ok()
    .and_then(|s| Uuid::parse_str(s.trim()).ok())
    .map(Some)
    .ok_or_else(|| AppError::Auth(format!("Invalid {} header.", USER_ID_HEADER)))
}

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let result = user_id_from(req).and_then(|id| {
      id.map(|user_id| AuthenticatedUser { user_id }).ok_or_else(|| {
        warn!("Missing X-User-ID header on authenticated route.");
        AppError::Auth("User authentication required.".to_string())
      })
    });
    ready(result)
  }
}

/// Identity when present; checkout also serves guests.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Uuid>);

impl FromRequest for MaybeUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(user_id_from(req).map(MaybeUser))
  }
}

#[derive(Debug, Clone, Copy)]
pub struct AdminGuard;

impl FromRequest for AdminGuard {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
      return ready(Err(AppError::Internal("Application state is not configured.".to_string())));
    };
    let provided = req.headers().get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
    let result = match provided {
      None => Err(AppError::Auth("Admin key required.".to_string())),
      Some(key) if secrets_match(&state.config.admin_api_key, key) => Ok(AdminGuard),
      Some(_) => {
        warn!(path = %req.path(), "Rejected admin request with wrong key.");
        Err(AppError::Forbidden("Invalid admin key.".to_string()))
      }
    };
    ready(result)
  }
}
