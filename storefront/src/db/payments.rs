// storefront/src/db/payments.rs

use crate::errors::Result;
use crate::models::{Payment, PaymentMethod, PaymentStatus};
use sqlx::PgExecutor;
use uuid::Uuid;

const COLUMNS: &str = "id, order_id, method, status, gateway_transaction_id, redirect_url, status_message, \
   amount_cents, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PaymentRecord {
  pub order_id: Uuid,
  pub method: PaymentMethod,
  pub status: PaymentStatus,
  pub gateway_transaction_id: Option<String>,
  pub redirect_url: Option<String>,
  pub status_message: Option<String>,
  pub amount_cents: i64,
}

pub async fn list_for_order<'e>(ex: impl PgExecutor<'e>, order_id: Uuid) -> Result<Vec<Payment>> {
  let sql = format!("SELECT {} FROM payments WHERE order_id = $1 ORDER BY created_at", COLUMNS);
  Ok(sqlx::query_as::<_, Payment>(&sql).bind(order_id).fetch_all(ex).await?)
}

pub async fn find_by_transaction<'e>(ex: impl PgExecutor<'e>, transaction_id: &str) -> Result<Option<Payment>> {
  let sql = format!("SELECT {} FROM payments WHERE gateway_transaction_id = $1 FOR UPDATE", COLUMNS);
  Ok(sqlx::query_as::<_, Payment>(&sql).bind(transaction_id).fetch_optional(ex).await?)
}

pub async fn insert<'e>(ex: impl PgExecutor<'e>, record: &PaymentRecord) -> Result<Payment> {
  let sql = format!(
    "INSERT INTO payments (id, order_id, method, status, gateway_transaction_id, redirect_url, status_message, amount_cents) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
    COLUMNS
  );
  Ok(
    sqlx::query_as::<_, Payment>(&sql)
      .bind(Uuid::new_v4())
      .bind(record.order_id)
      .bind(record.method)
      .bind(record.status)
      .bind(record.gateway_transaction_id.as_deref())
      .bind(record.redirect_url.as_deref())
      .bind(record.status_message.as_deref())
      .bind(record.amount_cents)
      .fetch_one(ex)
      .await?,
  )
}

/// Updates status and details; a known redirect URL is kept when the new one is absent.
pub async fn update<'e>(ex: impl PgExecutor<'e>, id: Uuid, record: &PaymentRecord) -> Result<Payment> {
  let sql = format!(
    "UPDATE payments SET status = $2, redirect_url = COALESCE($3, redirect_url), \
       status_message = COALESCE($4, status_message), updated_at = now() \
     WHERE id = $1 RETURNING {}",
    COLUMNS
  );
  Ok(
    sqlx::query_as::<_, Payment>(&sql)
      .bind(id)
      .bind(record.status)
      .bind(record.redirect_url.as_deref())
      .bind(record.status_message.as_deref())
      .fetch_one(ex)
      .await?,
  )
}
