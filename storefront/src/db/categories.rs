// storefront/src/db/categories.rs

use crate::errors::{AppError, Result};
use crate::models::{Category, CategoryInput};
use sqlx::{PgExecutor, PgPool};
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

pub async fn list<'e>(ex: impl PgExecutor<'e>) -> Result<Vec<Category>> {
  let sql = format!("SELECT {} FROM categories ORDER BY name", COLUMNS);
  Ok(sqlx::query_as::<_, Category>(&sql).fetch_all(ex).await?)
}

pub async fn find<'e>(ex: impl PgExecutor<'e>, id: Uuid) -> Result<Category> {
  let sql = format!("SELECT {} FROM categories WHERE id = $1", COLUMNS);
  sqlx::query_as::<_, Category>(&sql)
    .bind(id)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Category {} not found.", id)))
}

#[instrument(name = "db::categories::create", skip(ex, input), fields(name = %input.name))]
pub async fn create<'e>(ex: impl PgExecutor<'e>, input: &CategoryInput) -> Result<Category> {
  let (name, slug, description) = input.normalized()?;
  let sql = format!(
    "INSERT INTO categories (id, name, slug, description) VALUES ($1, $2, $3, $4) RETURNING {}",
    COLUMNS
  );
  sqlx::query_as::<_, Category>(&sql)
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(&slug)
    .bind(description)
    .fetch_one(ex)
    .await
    .map_err(|e| AppError::from_unique_violation(e, format!("Category '{}' already exists.", name)))
}

#[instrument(name = "db::categories::update", skip(ex, input))]
pub async fn update<'e>(ex: impl PgExecutor<'e>, id: Uuid, input: &CategoryInput) -> Result<Category> {
  let (name, slug, description) = input.normalized()?;
  let sql = format!(
    "UPDATE categories SET name = $2, slug = $3, description = $4, updated_at = now() \
     WHERE id = $1 RETURNING {}",
    COLUMNS
  );
  sqlx::query_as::<_, Category>(&sql)
    .bind(id)
    .bind(&name)
    .bind(&slug)
    .bind(description)
    .fetch_optional(ex)
    .await
    .map_err(|e| AppError::from_unique_violation(e, format!("Category '{}' already exists.", name)))?
    .ok_or_else(|| AppError::NotFound(format!("Category {} not found.", id)))
}

/// Refuses to delete a category that still owns products.
#[instrument(name = "db::categories::delete", skip(pool))]
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<()> {
  let mut tx = pool.begin().await?;
  let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
  if owned > 0 {
    return Err(AppError::Conflict(format!(
      "Category {} still has {} product(s).",
      id, owned
    )));
  }
  let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
  if deleted == 0 {
    return Err(AppError::NotFound(format!("Category {} not found.", id)));
  }
  tx.commit().await?;
  Ok(())
}
