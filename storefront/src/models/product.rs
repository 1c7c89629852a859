// storefront/src/models/product.rs

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub category_id: Option<Uuid>,
  pub name: String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub stock_quantity: i32,
  pub image_url: Option<String>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn can_fulfil(&self, quantity: i32) -> bool {
    self.is_active && quantity > 0 && self.stock_quantity >= quantity
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub category_id: Option<Uuid>,
  pub name: String,
  pub description: Option<String>,
  pub price_cents: i64,
  #[serde(default)]
  pub stock_quantity: i32,
  pub image_url: Option<String>,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_active() -> bool {
  true
}

impl NewProduct {
  pub fn validate(&self) -> Result<()> {
    validate_name(&self.name)?;
    validate_price(self.price_cents)?;
    validate_stock(self.stock_quantity)?;
    Ok(())
  }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
  pub category_id: Option<Option<Uuid>>,
  pub name: Option<String>,
  pub description: Option<String>,
  pub price_cents: Option<i64>,
  pub stock_quantity: Option<i32>,
  pub image_url: Option<String>,
  pub is_active: Option<bool>,
}

impl ProductUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      validate_name(name)?;
    }
    if let Some(price) = self.price_cents {
      validate_price(price)?;
    }
    if let Some(stock) = self.stock_quantity {
      validate_stock(stock)?;
    }
    Ok(())
  }

  pub fn apply_to(&self, product: &mut Product) {
    if let Some(category_id) = self.category_id {
      product.category_id = category_id;
    }
    if let Some(name) = &self.name {
      product.name = name.trim().to_string();
    }
    if let Some(description) = &self.description {
      product.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
    }
    if let Some(price) = self.price_cents {
      product.price_cents = price;
    }
    if let Some(stock) = self.stock_quantity {
      product.stock_quantity = stock;
    }
    if let Some(image_url) = &self.image_url {
      product.image_url = Some(image_url.clone()).filter(|u| !u.trim().is_empty());
    }
    if let Some(active) = self.is_active {
      product.is_active = active;
    }
  }
}

fn validate_name(name: &str) -> Result<()> {
  if name.trim().is_empty() {
    return Err(AppError::Validation("Product name cannot be empty.".to_string()));
  }
  Ok(())
}

fn validate_price(price_cents: i64) -> Result<()> {
  if price_cents <= 0 {
    return Err(AppError::Validation("Product price must be greater than zero.".to_string()));
  }
  Ok(())
}

fn validate_stock(stock: i32) -> Result<()> {
  if stock < 0 {
    return Err(AppError::Validation("Stock quantity cannot be negative.".to_string()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn product() -> Product {
    Product {
      id: Uuid::new_v4(),
      category_id: None,
      name: "Mochila".into(),
      description: None,
      price_cents: 9_900_000,
      stock_quantity: 3,
      image_url: None,
      is_active: true,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn fulfilment_requires_active_product_and_stock() {
    let mut p = product();
    assert!(p.can_fulfil(3));
    assert!(!p.can_fulfil(4));
    assert!(!p.can_fulfil(0));
    p.is_active = false;
    assert!(!p.can_fulfil(1));
  }

  #[test]
  fn update_validates_and_applies_only_present_fields() {
    let update = ProductUpdate {
      price_cents: Some(0),
      ..Default::default()
    };
    assert!(update.validate().is_err());

    let category = Uuid::new_v4();
    let update = ProductUpdate {
      category_id: Some(Some(category)),
      stock_quantity: Some(10),
      description: Some("  ".into()),
      ..Default::default()
    };
    update.validate().unwrap();
    let mut p = product();
    update.apply_to(&mut p);
    assert_eq!(p.category_id, Some(category));
    assert_eq!(p.stock_quantity, 10);
    assert_eq!(p.description, None);
    assert_eq!(p.name, "Mochila");
  }
}
