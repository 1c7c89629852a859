// storefront/src/db/products.rs

use crate::db::{Page, Paginated};
use crate::errors::{AppError, Result};
use crate::models::{NewProduct, Product, ProductUpdate};
use serde::Deserialize;
use sqlx::{PgExecutor, PgPool};
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str =
  "id, category_id, name, description, price_cents, stock_quantity, image_url, is_active, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
  pub category_id: Option<Uuid>,
  #[serde(rename = "q")]
  pub search: Option<String>,
  #[serde(default)]
  pub active_only: bool,
}

const FILTER: &str = "($1::uuid IS NULL OR category_id = $1) \
   AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%') \
   AND (NOT $3 OR is_active)";

/// Escapes `ILIKE` wildcards so a search term matches literally. Backslash
/// is the escape character, so it is escaped first.
fn escape_like(term: &str) -> String {
  term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[instrument(name = "db::products::list", skip(pool))]
pub async fn list(pool: &PgPool, filter: &ProductFilter, page: Page) -> Result<Paginated<Product>> {
  let search = filter
    .search
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(escape_like);

  let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {}", FILTER))
    .bind(filter.category_id)
    .bind(search.as_deref())
    .bind(filter.active_only)
    .fetch_one(pool)
    .await?;

  let sql = format!(
    "SELECT {} FROM products WHERE {} ORDER BY created_at DESC, id LIMIT $4 OFFSET $5",
    COLUMNS, FILTER
  );
  let items = sqlx::query_as::<_, Product>(&sql)
    .bind(filter.category_id)
    .bind(search.as_deref())
    .bind(filter.active_only)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

  Ok(Paginated::new(items, page, total))
}

pub async fn find<'e>(ex: impl PgExecutor<'e>, id: Uuid) -> Result<Product> {
  let sql = format!("SELECT {} FROM products WHERE id = $1", COLUMNS);
  sqlx::query_as::<_, Product>(&sql)
    .bind(id)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", id)))
}

pub async fn find_many<'e>(ex: impl PgExecutor<'e>, ids: &[Uuid]) -> Result<Vec<Product>> {
  let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", COLUMNS);
  Ok(sqlx::query_as::<_, Product>(&sql).bind(ids).fetch_all(ex).await?)
}

#[instrument(name = "db::products::create", skip(ex, input), fields(name = %input.name))]
pub async fn create<'e>(ex: impl PgExecutor<'e>, input: &NewProduct) -> Result<Product> {
  input.validate()?;
  let sql = format!(
    "INSERT INTO products (id, category_id, name, description, price_cents, stock_quantity, image_url, is_active) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
    COLUMNS
  );
  sqlx::query_as::<_, Product>(&sql)
    .bind(Uuid::new_v4())
    .bind(input.category_id)
    .bind(input.name.trim())
    .bind(input.description.as_deref())
    .bind(input.price_cents)
    .bind(input.stock_quantity)
    .bind(input.image_url.as_deref())
    .bind(input.is_active)
    .fetch_one(ex)
    .await
    .map_err(map_fk_violation)
}

#[instrument(name = "db::products::update", skip(pool, update))]
pub async fn update(pool: &PgPool, id: Uuid, update: &ProductUpdate) -> Result<Product> {
  update.validate()?;
  let mut tx = pool.begin().await?;
  let sql = format!("SELECT {} FROM products WHERE id = $1 FOR UPDATE", COLUMNS);
  let mut product = sqlx::query_as::<_, Product>(&sql)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", id)))?;
  update.apply_to(&mut product);

  let sql = format!(
    "UPDATE products SET category_id = $2, name = $3, description = $4, price_cents = $5, \
     stock_quantity = $6, image_url = $7, is_active = $8, updated_at = now() WHERE id = $1 RETURNING {}",
    COLUMNS
  );
  let saved = sqlx::query_as::<_, Product>(&sql)
    .bind(product.id)
    .bind(product.category_id)
    .bind(&product.name)
    .bind(product.description.as_deref())
    .bind(product.price_cents)
    .bind(product.stock_quantity)
    .bind(product.image_url.as_deref())
    .bind(product.is_active)
    .fetch_one(&mut *tx)
    .await
    .map_err(map_fk_violation)?;
  tx.commit().await?;
  Ok(saved)
}

/// Adds `delta` (may be negative) to the stock. Fails instead of going below zero.
#[instrument(name = "db::products::adjust_stock", skip(ex))]
pub async fn adjust_stock<'e>(ex: impl PgExecutor<'e>, id: Uuid, delta: i32) -> Result<Product> {
  let sql = format!(
    "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = now() \
     WHERE id = $1 AND stock_quantity + $2 >= 0 RETURNING {}",
    COLUMNS
  );
  sqlx::query_as::<_, Product>(&sql)
    .bind(id)
    .bind(delta)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Product {} missing or stock would go negative.", id)))
}

/// Takes `quantity` units only if that many are in stock; returns whether it did.
pub async fn decrement_stock<'e>(ex: impl PgExecutor<'e>, id: Uuid, quantity: i32) -> Result<bool> {
  let affected = sqlx::query(
    "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now() \
     WHERE id = $1 AND stock_quantity >= $2",
  )
  .bind(id)
  .bind(quantity)
  .execute(ex)
  .await?
  .rows_affected();
  Ok(affected == 1)
}

/// Active products at or below `threshold` units.
pub async fn low_stock<'e>(ex: impl PgExecutor<'e>, threshold: i32) -> Result<Vec<Product>> {
  let sql = format!(
    "SELECT {} FROM products WHERE is_active AND stock_quantity <= $1 ORDER BY stock_quantity, name",
    COLUMNS
  );
  Ok(sqlx::query_as::<_, Product>(&sql).bind(threshold).fetch_all(ex).await?)
}

/// Products referenced by orders are deactivated instead of removed.
#[instrument(name = "db::products::delete", skip(pool))]
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
  let mut tx = pool.begin().await?;
  let referenced: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
  let affected = if referenced {
    sqlx::query("UPDATE products SET is_active = FALSE, updated_at = now() WHERE id = $1")
  } else {
    sqlx::query("DELETE FROM products WHERE id = $1")
  }
  .bind(id)
  .execute(&mut *tx)
  .await?
  .rows_affected();
  if affected == 0 {
    return Err(AppError::NotFound(format!("Product {} not found.", id)));
  }
  tx.commit().await?;
  Ok(!referenced)
}

fn map_fk_violation(err: sqlx::Error) -> AppError {
  match &err {
    sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
      AppError::Validation("Referenced category does not exist.".to_string())
    }
    _ => AppError::Sqlx(err),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn search_terms_match_literally() {
    assert_eq!(escape_like("café"), "café");
    assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    assert_eq!(escape_like("a\\b%"), "a\\\\b\\%");
  }
}
