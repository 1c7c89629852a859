// storefront/src/db/orders.rs

use crate::db::{coupons, payments, products, Page, Paginated};
use crate::errors::{AppError, Result};
use crate::models::{Order, OrderItem, OrderItemDetail, OrderStatus, Payment, PaymentStatus};
use crate::pricing::PriceBreakdown;
use serde::Serialize;
use sqlx::{Connection, PgConnection, PgExecutor, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, address_id, coupon_id, status, subtotal_cents, discount_cents, shipping_cents, \
   total_cents, currency, reference, carrier, tracking_number, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub address_id: Option<Uuid>,
  pub coupon_id: Option<Uuid>,
  pub price: PriceBreakdown,
  pub currency: String,
  pub reference: String,
}

#[derive(Debug, Clone, Copy)]
pub struct NewOrderItem {
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItemDetail>,
  pub payments: Vec<Payment>,
}

/// Inserts the order in `pending` with its items. Callers run this inside a transaction.
#[instrument(name = "db::orders::insert_with_items", skip_all, fields(reference = %order.reference))]
pub async fn insert_with_items(conn: &mut PgConnection, order: &NewOrder, items: &[NewOrderItem]) -> Result<Order> {
  let sql = format!(
    "INSERT INTO orders (id, user_id, address_id, coupon_id, status, subtotal_cents, discount_cents, \
       shipping_cents, total_cents, currency, reference) \
     VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, $10) RETURNING {}",
    COLUMNS
  );
  let saved = sqlx::query_as::<_, Order>(&sql)
    .bind(Uuid::new_v4())
    .bind(order.user_id)
    .bind(order.address_id)
    .bind(order.coupon_id)
    .bind(order.price.subtotal_cents)
    .bind(order.price.discount_cents)
    .bind(order.price.shipping_cents)
    .bind(order.price.total_cents)
    .bind(&order.currency)
    .bind(&order.reference)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::from_unique_violation(e, format!("Order reference {} already used.", order.reference)))?;

  for item in items {
    sqlx::query(
      "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price_cents) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(saved.id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .execute(&mut *conn)
    .await?;
  }
  Ok(saved)
}

pub async fn find<'e>(ex: impl PgExecutor<'e>, id: Uuid) -> Result<Order> {
  let sql = format!("SELECT {} FROM orders WHERE id = $1", COLUMNS);
  sqlx::query_as::<_, Order>(&sql)
    .bind(id)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", id)))
}

async fn lock<'e>(ex: impl PgExecutor<'e>, id: Uuid) -> Result<Order> {
  let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", COLUMNS);
  sqlx::query_as::<_, Order>(&sql)
    .bind(id)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", id)))
}

pub async fn lock_by_reference<'e>(ex: impl PgExecutor<'e>, reference: &str) -> Result<Order> {
  let sql = format!("SELECT {} FROM orders WHERE reference = $1 FOR UPDATE", COLUMNS);
  sqlx::query_as::<_, Order>(&sql)
    .bind(reference)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order with reference {} not found.", reference)))
}

pub async fn list(pool: &PgPool, status: Option<OrderStatus>, page: Page) -> Result<Paginated<Order>> {
  let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)")
    .bind(status)
    .fetch_one(pool)
    .await?;
  let sql = format!(
    "SELECT {} FROM orders WHERE ($1::order_status IS NULL OR status = $1) \
     ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
    COLUMNS
  );
  let items = sqlx::query_as::<_, Order>(&sql)
    .bind(status)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
  Ok(Paginated::new(items, page, total))
}

pub async fn list_for_user<'e>(ex: impl PgExecutor<'e>, user_id: Uuid) -> Result<Vec<Order>> {
  let sql = format!("SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC", COLUMNS);
  Ok(sqlx::query_as::<_, Order>(&sql).bind(user_id).fetch_all(ex).await?)
}

pub async fn items<'e>(ex: impl PgExecutor<'e>, order_id: Uuid) -> Result<Vec<OrderItem>> {
  Ok(
    sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, quantity, unit_price_cents FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(ex)
    .await?,
  )
}

pub async fn detail(pool: &PgPool, id: Uuid) -> Result<OrderDetail> {
  let order = find(pool, id).await?;
  let items = sqlx::query_as::<_, OrderItemDetail>(
    "SELECT oi.id, oi.product_id, p.name AS product_name, oi.quantity, oi.unit_price_cents, \
       oi.quantity * oi.unit_price_cents AS line_total_cents \
     FROM order_items oi JOIN products p ON p.id = oi.product_id \
     WHERE oi.order_id = $1 ORDER BY p.name",
  )
  .bind(id)
  .fetch_all(pool)
  .await?;
  let payments = payments::list_for_order(pool, id).await?;
  Ok(OrderDetail { order, items, payments })
}

pub async fn set_status<'e>(ex: impl PgExecutor<'e>, id: Uuid, status: OrderStatus) -> Result<Order> {
  let sql = format!(
    "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING {}",
    COLUMNS
  );
  sqlx::query_as::<_, Order>(&sql)
    .bind(id)
    .bind(status)
    .fetch_optional(ex)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", id)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockSettlement {
  Taken,
  /// Nothing was taken because this product ran short.
  Short { product_id: Uuid },
}

/// Takes every unit of the order out of stock, or none of them, and counts
/// the coupon redemption. Runs in a savepoint so a shortfall leaves the
/// caller's transaction usable.
#[instrument(name = "db::orders::settle_payment", skip_all, fields(order_id = %order.id))]
pub async fn settle_payment(conn: &mut PgConnection, order: &Order) -> Result<StockSettlement> {
  let mut savepoint = conn.begin().await?;
  for item in items(&mut *savepoint, order.id).await? {
    if !products::decrement_stock(&mut *savepoint, item.product_id, item.quantity).await? {
      savepoint.rollback().await?;
      return Ok(StockSettlement::Short {
        product_id: item.product_id,
      });
    }
  }
  if let Some(coupon_id) = order.coupon_id {
    if !coupons::redeem(&mut *savepoint, coupon_id).await? {
      warn!(%coupon_id, order_id = %order.id, "Coupon redemption limit reached at payment time.");
    }
  }
  savepoint.commit().await?;
  Ok(StockSettlement::Taken)
}

/// A manual move to `paid` is only allowed once the gateway approved a payment.
pub fn check_manual_payment(order: &Order, payments: &[Payment]) -> Result<()> {
  if payments.iter().any(|p| p.status == PaymentStatus::Approved) {
    Ok(())
  } else {
    Err(AppError::Validation(format!(
      "Order {} has no approved payment; it is marked paid when the gateway confirms one.",
      order.reference
    )))
  }
}

/// Moves the order through the status machine. Marking an order paid takes
/// its units out of stock; cancelling a paid order puts them back.
#[instrument(name = "db::orders::update_status", skip(pool))]
pub async fn update_status(pool: &PgPool, id: Uuid, next: OrderStatus) -> Result<Order> {
  let mut tx = pool.begin().await?;
  let order = lock(&mut *tx, id).await?;
  order.status.transition_to(next)?;

  if next == OrderStatus::Paid {
    check_manual_payment(&order, &payments::list_for_order(&mut *tx, id).await?)?;
    if let StockSettlement::Short { product_id } = settle_payment(&mut *tx, &order).await? {
      return Err(AppError::Conflict(format!(
        "Insufficient stock for product {} to confirm order {}.",
        product_id, order.reference
      )));
    }
  }

  if order.status.returns_stock_on(next) {
    for item in items(&mut *tx, id).await? {
      sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = now() WHERE id = $1")
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
    }
    info!(order_id = %id, "Restocked items of cancelled paid order.");
  }

  let updated = set_status(&mut *tx, id, next).await?;
  tx.commit().await?;
  Ok(updated)
}

/// Records carrier and tracking number. A `paid` order moves to `shipped`;
/// an already shipped order only gets its tracking data corrected.
#[instrument(name = "db::orders::set_shipment", skip(pool))]
pub async fn set_shipment(pool: &PgPool, id: Uuid, carrier: &str, tracking_number: &str) -> Result<Order> {
  let carrier = carrier.trim();
  let tracking_number = tracking_number.trim();
  if carrier.is_empty() || tracking_number.is_empty() {
    return Err(AppError::Validation("Carrier and tracking number are required.".to_string()));
  }

  let mut tx = pool.begin().await?;
  let order = lock(&mut *tx, id).await?;
  let status = match order.status {
    OrderStatus::Shipped => OrderStatus::Shipped,
    current => current.transition_to(OrderStatus::Shipped)?,
  };
  let sql = format!(
    "UPDATE orders SET status = $2, carrier = $3, tracking_number = $4, updated_at = now() WHERE id = $1 RETURNING {}",
    COLUMNS
  );
  let updated = sqlx::query_as::<_, Order>(&sql)
    .bind(id)
    .bind(status)
    .bind(carrier)
    .bind(tracking_number)
    .fetch_one(&mut *tx)
    .await?;
  tx.commit().await?;
  Ok(updated)
}
