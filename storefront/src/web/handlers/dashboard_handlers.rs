// storefront/src/web/handlers/dashboard_handlers.rs

//! Admin dashboard. Every endpoint accepts `preset`, or `from` and `to`
//! (`YYYY-MM-DD`, inclusive), plus `granularity` where a series is returned.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::analytics::{
  bucket_sales, goal_progress, roll_up_categories, summarize, DashboardQuery, PeriodTotals, RangePreset,
};
use crate::db::{analytics as queries, products};
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminGuard;

const DEFAULT_TOP_PRODUCTS: i64 = 5;
const MAX_TOP_PRODUCTS: i64 = 50;

#[instrument(name = "handler::dashboard_summary", skip(_admin, app_state))]
pub async fn summary_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
  let (range, _) = query.resolve(Utc::now())?;
  let previous = range.previous();
  let pool = &app_state.db_pool;

  let current_totals = PeriodTotals::from_points(
    &queries::order_points(pool, &range).await?,
    &range,
    queries::new_customers(pool, &range).await?,
  );
  let previous_totals = PeriodTotals::from_points(
    &queries::order_points(pool, &previous).await?,
    &previous,
    queries::new_customers(pool, &previous).await?,
  );
  Ok(HttpResponse::Ok().json(summarize(range, current_totals, previous_totals)))
}

#[instrument(name = "handler::dashboard_sales", skip(_admin, app_state))]
pub async fn sales_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
  let (range, granularity) = query.resolve(Utc::now())?;
  let points = queries::order_points(&app_state.db_pool, &range).await?;
  Ok(HttpResponse::Ok().json(json!({
    "range": range,
    "granularity": granularity,
    "buckets": bucket_sales(&points, &range, granularity),
  })))
}

#[instrument(name = "handler::dashboard_categories", skip(_admin, app_state))]
pub async fn categories_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
  let (range, _) = query.resolve(Utc::now())?;
  let rows = queries::category_sales(&app_state.db_pool, &range).await?;
  Ok(HttpResponse::Ok().json(json!({
    "range": range,
    "categories": roll_up_categories(&rows),
  })))
}

/// Progress against `MONTHLY_REVENUE_GOAL_CENTS`; the current month unless a range is given.
#[instrument(name = "handler::dashboard_goal", skip(_admin, app_state))]
pub async fn goal_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
  let mut query = query.into_inner();
  if query.preset.is_none() && query.from.is_none() && query.to.is_none() {
    query.preset = Some(RangePreset::ThisMonth);
  }
  let (range, _) = query.resolve(Utc::now())?;
  let totals = PeriodTotals::from_points(&queries::order_points(&app_state.db_pool, &range).await?, &range, 0);
  Ok(HttpResponse::Ok().json(json!({
    "range": range,
    "goal": goal_progress(totals.revenue_cents, app_state.config.monthly_revenue_goal_cents),
  })))
}

#[instrument(name = "handler::dashboard_top_products", skip(_admin, app_state))]
pub async fn top_products_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
  let (range, _) = query.resolve(Utc::now())?;
  let limit = query.limit.unwrap_or(DEFAULT_TOP_PRODUCTS).clamp(1, MAX_TOP_PRODUCTS);
  let top = queries::top_products(&app_state.db_pool, &range, limit).await?;
  Ok(HttpResponse::Ok().json(json!({ "range": range, "products": top })))
}

#[instrument(name = "handler::dashboard_low_stock", skip(_admin, app_state))]
pub async fn low_stock_handler(_admin: AdminGuard, app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let threshold = app_state.config.low_stock_threshold;
  let low = products::low_stock(&app_state.db_pool, threshold).await?;
  Ok(HttpResponse::Ok().json(json!({ "threshold": threshold, "products": low })))
}
