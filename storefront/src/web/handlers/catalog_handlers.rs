// storefront/src/web/handlers/catalog_handlers.rs

//! Categories and products: public reads plus the admin write routes.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::products::ProductFilter;
use crate::db::{categories, products, Page};
use crate::errors::AppError;
use crate::models::{CategoryInput, NewProduct, ProductUpdate};
use crate::state::AppState;
use crate::web::extractors::AdminGuard;

// --- Categories ---

pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(categories::list(&app_state.db_pool).await?))
}

pub async fn get_category_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(categories::find(&app_state.db_pool, path.into_inner()).await?))
}

#[instrument(name = "handler::create_category", skip_all, fields(name = %body.name))]
pub async fn create_category_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  body: web::Json<CategoryInput>,
) -> Result<HttpResponse, AppError> {
  let category = categories::create(&app_state.db_pool, &body).await?;
  info!(category_id = %category.id, slug = %category.slug, "Category created.");
  Ok(HttpResponse::Created().json(category))
}

#[instrument(name = "handler::update_category", skip(_admin, app_state, body))]
pub async fn update_category_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  body: web::Json<CategoryInput>,
) -> Result<HttpResponse, AppError> {
  let category = categories::update(&app_state.db_pool, path.into_inner(), &body).await?;
  Ok(HttpResponse::Ok().json(category))
}

#[instrument(name = "handler::delete_category", skip(_admin, app_state))]
pub async fn delete_category_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  categories::delete(&app_state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

// --- Products ---

/// Storefront listing only shows active products.
#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  filter: web::Query<ProductFilter>,
  page: web::Query<Page>,
) -> Result<HttpResponse, AppError> {
  let mut filter = filter.into_inner();
  filter.active_only = true;
  Ok(HttpResponse::Ok().json(products::list(&app_state.db_pool, &filter, page.into_inner()).await?))
}

pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product = products::find(&app_state.db_pool, path.into_inner()).await?;
  if !product.is_active {
    return Err(AppError::NotFound(format!("Product {} not found.", product.id)));
  }
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::admin_list_products", skip(_admin, app_state))]
pub async fn admin_list_products_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  filter: web::Query<ProductFilter>,
  page: web::Query<Page>,
) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(products::list(&app_state.db_pool, &filter, page.into_inner()).await?))
}

pub async fn admin_get_product_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(products::find(&app_state.db_pool, path.into_inner()).await?))
}

#[instrument(name = "handler::create_product", skip_all, fields(name = %body.name))]
pub async fn create_product_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  body: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  body.validate()?;
  let product = products::create(&app_state.db_pool, &body).await?;
  info!(product_id = %product.id, "Product created.");
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::update_product", skip(_admin, app_state, body))]
pub async fn update_product_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  body: web::Json<ProductUpdate>,
) -> Result<HttpResponse, AppError> {
  body.validate()?;
  let product = products::update(&app_state.db_pool, path.into_inner(), &body).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
  pub delta: i32,
}

#[instrument(name = "handler::adjust_stock", skip(_admin, app_state))]
pub async fn adjust_stock_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  body: web::Json<StockAdjustment>,
) -> Result<HttpResponse, AppError> {
  if body.delta == 0 {
    return Err(AppError::Validation("Stock adjustment cannot be zero.".to_string()));
  }
  let product = products::adjust_stock(&app_state.db_pool, path.into_inner(), body.delta).await?;
  info!(product_id = %product.id, stock = product.stock_quantity, "Stock adjusted.");
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::delete_product", skip(_admin, app_state))]
pub async fn delete_product_handler(
  _admin: AdminGuard,
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let id = path.into_inner();
  if products::delete(&app_state.db_pool, id).await? {
    Ok(HttpResponse::NoContent().finish())
  } else {
    info!(product_id = %id, "Product has orders; deactivated instead of deleted.");
    Ok(HttpResponse::Ok().json(json!({ "id": id, "deactivated": true })))
  }
}
