// storefront/src/db/analytics.rs

//! Raw dashboard queries. Aggregation into series and shares happens in
//! `crate::analytics`.

use crate::analytics::{CategorySalesRow, DateRange, OrderPoint, TopProduct};
use crate::errors::Result;
use crate::models::OrderStatus;
use sqlx::PgExecutor;

/// Revenue-bearing orders created inside `range`.
pub async fn order_points<'e>(ex: impl PgExecutor<'e>, range: &DateRange) -> Result<Vec<OrderPoint>> {
  Ok(
    sqlx::query_as::<_, OrderPoint>(
      "SELECT created_at, total_cents, status FROM orders \
       WHERE created_at >= $1 AND created_at < $2 AND status = ANY($3) ORDER BY created_at",
    )
    .bind(range.start)
    .bind(range.end)
    .bind(&OrderStatus::REVENUE[..])
    .fetch_all(ex)
    .await?,
  )
}

pub async fn new_customers<'e>(ex: impl PgExecutor<'e>, range: &DateRange) -> Result<i64> {
  Ok(
    sqlx::query_scalar(
      "SELECT COUNT(*) FROM users WHERE role = 'customer' AND created_at >= $1 AND created_at < $2",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_one(ex)
    .await?,
  )
}

/// Item revenue (before order-level discounts) grouped by category name.
pub async fn category_sales<'e>(ex: impl PgExecutor<'e>, range: &DateRange) -> Result<Vec<CategorySalesRow>> {
  Ok(
    sqlx::query_as::<_, CategorySalesRow>(
      "SELECT c.name AS category, \
         COALESCE(SUM(oi.quantity * oi.unit_price_cents), 0)::BIGINT AS revenue_cents, \
         COALESCE(SUM(oi.quantity), 0)::BIGINT AS units \
       FROM order_items oi \
       JOIN orders o ON o.id = oi.order_id \
       JOIN products p ON p.id = oi.product_id \
       LEFT JOIN categories c ON c.id = p.category_id \
       WHERE o.created_at >= $1 AND o.created_at < $2 AND o.status = ANY($3) \
       GROUP BY c.name",
    )
    .bind(range.start)
    .bind(range.end)
    .bind(&OrderStatus::REVENUE[..])
    .fetch_all(ex)
    .await?,
  )
}

pub async fn top_products<'e>(ex: impl PgExecutor<'e>, range: &DateRange, limit: i64) -> Result<Vec<TopProduct>> {
  Ok(
    sqlx::query_as::<_, TopProduct>(
      "SELECT p.id AS product_id, p.name, \
         SUM(oi.quantity)::BIGINT AS units, \
         SUM(oi.quantity * oi.unit_price_cents)::BIGINT AS revenue_cents \
       FROM order_items oi \
       JOIN orders o ON o.id = oi.order_id \
       JOIN products p ON p.id = oi.product_id \
       WHERE o.created_at >= $1 AND o.created_at < $2 AND o.status = ANY($3) \
       GROUP BY p.id, p.name \
       ORDER BY revenue_cents DESC, p.name \
       LIMIT $4",
    )
    .bind(range.start)
    .bind(range.end)
    .bind(&OrderStatus::REVENUE[..])
    .bind(limit)
    .fetch_all(ex)
    .await?,
  )
}
