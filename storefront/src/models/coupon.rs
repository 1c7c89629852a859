// storefront/src/models/coupon.rs

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "coupon_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
  /// `value` is a whole percentage, 1..=100.
  Percent,
  /// `value` is an amount in cents.
  Fixed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Coupon {
  pub id: Uuid,
  pub code: String,
  pub kind: CouponKind,
  pub value: i64,
  pub active: bool,
  pub starts_at: Option<DateTime<Utc>>,
  pub expires_at: Option<DateTime<Utc>>,
  pub max_redemptions: Option<i32>,
  pub times_redeemed: i32,
  pub created_at: DateTime<Utc>,
}

impl Coupon {
  /// Checks that the coupon can be redeemed at `now`.
  pub fn ensure_redeemable(&self, now: DateTime<Utc>) -> Result<()> {
    if !self.active {
      return Err(AppError::Validation(format!("Coupon {} is not active.", self.code)));
    }
    if matches!(self.starts_at, Some(start) if now < start) {
      return Err(AppError::Validation(format!("Coupon {} is not valid yet.", self.code)));
    }
    if matches!(self.expires_at, Some(end) if now >= end) {
      return Err(AppError::Validation(format!("Coupon {} has expired.", self.code)));
    }
    if matches!(self.max_redemptions, Some(max) if self.times_redeemed >= max) {
      return Err(AppError::Validation(format!(
        "Coupon {} has reached its redemption limit.",
        self.code
      )));
    }
    Ok(())
  }

  /// Discount in cents for `subtotal_cents`, never more than the subtotal.
  pub fn discount_for(&self, subtotal_cents: i64, now: DateTime<Utc>) -> Result<i64> {
    self.ensure_redeemable(now)?;
    let subtotal = subtotal_cents.max(0);
    let discount = match self.kind {
      CouponKind::Percent => subtotal * self.value.clamp(0, 100) / 100,
      CouponKind::Fixed => self.value.max(0),
    };
    Ok(discount.min(subtotal))
  }
}

pub fn normalize_code(raw: &str) -> String {
  raw.trim().to_uppercase()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCoupon {
  pub code: String,
  pub kind: CouponKind,
  pub value: i64,
  pub starts_at: Option<DateTime<Utc>>,
  pub expires_at: Option<DateTime<Utc>>,
  pub max_redemptions: Option<i32>,
}

impl NewCoupon {
  pub fn validate(&self) -> Result<()> {
    let code = normalize_code(&self.code);
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
      return Err(AppError::Validation(
        "Coupon code must be non-empty and use letters, digits, '-' or '_'.".to_string(),
      ));
    }
    match self.kind {
      CouponKind::Percent if !(1..=100).contains(&self.value) => {
        return Err(AppError::Validation(
          "Percent coupons need a value between 1 and 100.".to_string(),
        ));
      }
      CouponKind::Fixed if self.value <= 0 => {
        return Err(AppError::Validation("Fixed coupons need a positive value.".to_string()));
      }
      _ => {}
    }
    if let (Some(start), Some(end)) = (self.starts_at, self.expires_at) {
      if end <= start {
        return Err(AppError::Validation("Coupon expires before it starts.".to_string()));
      }
    }
    if matches!(self.max_redemptions, Some(max) if max <= 0) {
      return Err(AppError::Validation("max_redemptions must be positive.".to_string()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn coupon(kind: CouponKind, value: i64) -> Coupon {
    Coupon {
      id: Uuid::new_v4(),
      code: "BIENVENIDA".into(),
      kind,
      value,
      active: true,
      starts_at: None,
      expires_at: None,
      max_redemptions: None,
      times_redeemed: 0,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn percent_discount_is_proportional() {
    let now = Utc::now();
    assert_eq!(coupon(CouponKind::Percent, 10).discount_for(50_000, now).unwrap(), 5_000);
    assert_eq!(coupon(CouponKind::Percent, 100).discount_for(50_000, now).unwrap(), 50_000);
  }

  #[test]
  fn fixed_discount_is_capped_at_subtotal() {
    let now = Utc::now();
    assert_eq!(coupon(CouponKind::Fixed, 7_000).discount_for(50_000, now).unwrap(), 7_000);
    assert_eq!(coupon(CouponKind::Fixed, 70_000).discount_for(50_000, now).unwrap(), 50_000);
  }

  #[test]
  fn unusable_coupons_are_rejected() {
    let now = Utc::now();

    let mut inactive = coupon(CouponKind::Fixed, 100);
    inactive.active = false;
    assert!(inactive.discount_for(1_000, now).is_err());

    let mut future = coupon(CouponKind::Fixed, 100);
    future.starts_at = Some(now + Duration::days(1));
    assert!(future.discount_for(1_000, now).is_err());

    let mut expired = coupon(CouponKind::Fixed, 100);
    expired.expires_at = Some(now - Duration::seconds(1));
    assert!(expired.discount_for(1_000, now).is_err());

    let mut exhausted = coupon(CouponKind::Fixed, 100);
    exhausted.max_redemptions = Some(3);
    exhausted.times_redeemed = 3;
    assert!(exhausted.discount_for(1_000, now).is_err());
  }

  #[test]
  fn new_coupon_validation() {
    let mut input = NewCoupon {
      code: " promo-10 ".into(),
      kind: CouponKind::Percent,
      value: 10,
      starts_at: None,
      expires_at: None,
      max_redemptions: Some(50),
    };
    assert!(input.validate().is_ok());
    assert_eq!(normalize_code(&input.code), "PROMO-10");

    input.value = 101;
    assert!(input.validate().is_err());

    input.kind = CouponKind::Fixed;
    input.value = 0;
    assert!(input.validate().is_err());
  }
}
