// storefront/src/db/coupons.rs

use crate::errors::{AppError, Result};
use crate::models::{normalize_code, Coupon, NewCoupon};
use sqlx::PgExecutor;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str =
  "id, code, kind, value, active, starts_at, expires_at, max_redemptions, times_redeemed, created_at";

#[instrument(name = "db::coupons::create", skip(ex, input), fields(code = %input.code))]
pub async fn create<'e>(ex: impl PgExecutor<'e>, input: &NewCoupon) -> Result<Coupon> {
  input.validate()?;
  let code = normalize_code(&input.code);
  let sql = format!(
    "INSERT INTO coupons (id, code, kind, value, starts_at, expires_at, max_redemptions) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
    COLUMNS
  );
  sqlx::query_as::<_, Coupon>(&sql)
    .bind(Uuid::new_v4())
    .bind(&code)
    .bind(input.kind)
    .bind(input.value)
    .bind(input.starts_at)
    .bind(input.expires_at)
    .bind(input.max_redemptions)
    .fetch_one(ex)
    .await
    .map_err(|e| AppError::from_unique_violation(e, format!("Coupon {} already exists.", code)))
}

pub async fn list<'e>(ex: impl PgExecutor<'e>) -> Result<Vec<Coupon>> {
  let sql = format!("SELECT {} FROM coupons ORDER BY created_at DESC", COLUMNS);
  Ok(sqlx::query_as::<_, Coupon>(&sql).fetch_all(ex).await?)
}

/// Case-insensitive lookup.
pub async fn find_by_code<'e>(ex: impl PgExecutor<'e>, code: &str) -> Result<Coupon> {
  let code = normalize_code(code);
  let sql = format!("SELECT {} FROM coupons WHERE code = $1", COLUMNS);
  sqlx::query_as::<_, Coupon>(&sql)
    .bind(&code)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Coupon {} not found.", code)))
}

pub async fn deactivate<'e>(ex: impl PgExecutor<'e>, id: Uuid) -> Result<Coupon> {
  let sql = format!("UPDATE coupons SET active = FALSE WHERE id = $1 RETURNING {}", COLUMNS);
  sqlx::query_as::<_, Coupon>(&sql)
    .bind(id)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Coupon {} not found.", id)))
}

/// Counts one redemption unless the limit is already reached; returns whether it counted.
pub async fn redeem<'e>(ex: impl PgExecutor<'e>, id: Uuid) -> Result<bool> {
  let affected = sqlx::query(
    "UPDATE coupons SET times_redeemed = times_redeemed + 1 \
     WHERE id = $1 AND (max_redemptions IS NULL OR times_redeemed < max_redemptions)",
  )
  .bind(id)
  .execute(ex)
  .await?
  .rows_affected();
  Ok(affected == 1)
}
