// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{orders, users, Page};
use crate::errors::AppError;
use crate::models::{Order, OrderStatus};
use crate::state::AppState;
use crate::web::extractors::{AdminGuard, AuthenticatedUser};

/// Customers see their own orders; admins see all of them.
async fn load_owned(app_state: &AppState, auth_user: &AuthenticatedUser, order_id: Uuid) -> Result<Order, AppError> {
  let order = orders::find(&app_state.db_pool, order_id).await?;
  if order.user_id != auth_user.user_id {
    let caller = users::find(&app_state.db_pool, auth_user.user_id).await?;
    if !caller.is_admin() {
      warn!(%order_id, user_id = %auth_user.user_id, "Order requested by a user who does not own it.");
      return Err(AppError::Forbidden("This order belongs to another customer.".to_string()));
    }
  }
  Ok(order)
}

// --- Customer ---

#[instrument(name = "handler::my_orders", skip(app_state), fields(user_id = %auth_user.user_id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = orders::list_for_user(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::my_order", skip(app_state), fields(user_id = %auth_user.user_id))]
pub async fn my_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = load_owned(&app_state, &auth_user, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(orders::detail(&app_state.db_pool, order.id).await?))
}

/// Live carrier status for a shipped order.
#[instrument(name = "handler::order_tracking", skip(app_state), fields(user_id = %auth_user.user_id))]
pub async fn order_tracking_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = load_owned(&app_state, &auth_user, path.into_inner()).await?;
  track(&app_state, &order).await
}

async fn track(app_state: &AppState, order: &Order) -> Result<HttpResponse, AppError> {
  let (Some(carrier), Some(number)) = (order.carrier.as_deref(), order.tracking_number.as_deref()) else {
    return Err(AppError::NotFound(format!(
      "Order {} has no shipment yet.",
      order.reference
    )));
  };
  let info = app_state.tracker.track(carrier, number).await?;
  Ok(HttpResponse::Ok().json(info))
}

// --- Admin ---

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
  pub status: Option<OrderStatus>,
}

#[instrument(name = "handler::admin_list_orders", skip(_admin, app_state))]
pub async fn admin_list_orders_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  query: web::Query<OrderListQuery>,
  page: web::Query<Page>,
) -> Result<HttpResponse, AppError> {
  let listed = orders::list(&app_state.db_pool, query.status, page.into_inner()).await?;
  Ok(HttpResponse::Ok().json(listed))
}

pub async fn admin_get_order_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(orders::detail(&app_state.db_pool, path.into_inner()).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
  pub status: OrderStatus,
}

#[instrument(name = "handler::update_order_status", skip(_admin, app_state))]
pub async fn update_order_status_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  body: web::Json<StatusChange>,
) -> Result<HttpResponse, AppError> {
  let order = orders::update_status(&app_state.db_pool, path.into_inner(), body.status).await?;
  info!(order_id = %order.id, status = %order.status, "Order status updated.");
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::cancel_order", skip(_admin, app_state))]
pub async fn cancel_order_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = orders::update_status(&app_state.db_pool, path.into_inner(), OrderStatus::Cancelled).await?;
  info!(order_id = %order.id, "Order cancelled.");
  Ok(HttpResponse::Ok().json(order))
}

#[derive(Debug, Deserialize)]
pub struct ShipmentInput {
  pub carrier: String,
  pub tracking_number: String,
}

#[instrument(name = "handler::set_shipment", skip(_admin, app_state))]
pub async fn set_shipment_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  body: web::Json<ShipmentInput>,
) -> Result<HttpResponse, AppError> {
  let order = orders::set_shipment(&app_state.db_pool, path.into_inner(), &body.carrier, &body.tracking_number).await?;
  info!(order_id = %order.id, carrier = ?order.carrier, "Shipment recorded.");
  Ok(HttpResponse::Ok().json(order))
}

pub async fn admin_order_tracking_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = orders::find(&app_state.db_pool, path.into_inner()).await?;
  track(&app_state, &order).await
}
