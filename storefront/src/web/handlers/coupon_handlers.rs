// storefront/src/web/handlers/coupon_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::coupons;
use crate::errors::AppError;
use crate::models::{normalize_code, NewCoupon};
use crate::state::AppState;
use crate::web::extractors::AdminGuard;

#[derive(Debug, Deserialize)]
pub struct CouponCheck {
  pub code: String,
  pub subtotal_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CouponQuote {
  pub code: String,
  pub discount_cents: i64,
  pub subtotal_after_discount_cents: i64,
}

/// Quotes the discount a coupon gives on a cart subtotal without redeeming it.
#[instrument(name = "handler::validate_coupon", skip(app_state))]
pub async fn validate_coupon_handler(
  app_state: web::Data<AppState>,
  body: web::Json<CouponCheck>,
) -> Result<HttpResponse, AppError> {
  if body.subtotal_cents < 0 {
    return Err(AppError::Validation("Subtotal cannot be negative.".to_string()));
  }
  let coupon = coupons::find_by_code(&app_state.db_pool, &normalize_code(&body.code)).await?;
  let discount_cents = coupon.discount_for(body.subtotal_cents, Utc::now())?;
  Ok(HttpResponse::Ok().json(CouponQuote {
    code: coupon.code,
    discount_cents,
    subtotal_after_discount_cents: body.subtotal_cents - discount_cents,
  }))
}

#[instrument(name = "handler::create_coupon", skip_all, fields(code = %body.code))]
pub async fn create_coupon_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  body: web::Json<NewCoupon>,
) -> Result<HttpResponse, AppError> {
  body.validate()?;
  let coupon = coupons::create(&app_state.db_pool, &body).await?;
  info!(coupon_id = %coupon.id, "Coupon created.");
  Ok(HttpResponse::Created().json(coupon))
}

pub async fn list_coupons_handler(_admin: AdminGuard, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(coupons::list(&app_state.db_pool).await?))
}

#[instrument(name = "handler::deactivate_coupon", skip(_admin, app_state))]
pub async fn deactivate_coupon_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let coupon = coupons::deactivate(&app_state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(coupon))
}
