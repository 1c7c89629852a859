// storefront/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{
  auth_handlers, catalog_handlers, checkout_handlers, coupon_handlers, dashboard_handlers, order_handlers,
  webhook_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler)),
      )
      .service(
        web::scope("/categories")
          .route("", web::get().to(catalog_handlers::list_categories_handler))
          .route("/{category_id}", web::get().to(catalog_handlers::get_category_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(catalog_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(catalog_handlers::get_product_handler)),
      )
      .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
      .route("/payments/pse/banks", web::get().to(checkout_handlers::pse_banks_handler))
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::my_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::my_order_handler))
          .route("/{order_id}/tracking", web::get().to(order_handlers::order_tracking_handler)),
      )
      .route("/coupons/validate", web::post().to(coupon_handlers::validate_coupon_handler))
      .route("/webhooks/gateway", web::post().to(webhook_handlers::gateway_event_handler))
      .service(web::scope("/admin").configure(configure_admin_routes)),
  );
}

/// Every handler here takes the `AdminGuard` extractor.
fn configure_admin_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .service(
      web::scope("/categories")
        .route("", web::post().to(catalog_handlers::create_category_handler))
        .route("/{category_id}", web::put().to(catalog_handlers::update_category_handler))
        .route("/{category_id}", web::delete().to(catalog_handlers::delete_category_handler)),
    )
    .service(
      web::scope("/products")
        .route("", web::get().to(catalog_handlers::admin_list_products_handler))
        .route("", web::post().to(catalog_handlers::create_product_handler))
        .route("/{product_id}", web::get().to(catalog_handlers::admin_get_product_handler))
        .route("/{product_id}", web::patch().to(catalog_handlers::update_product_handler))
        .route("/{product_id}", web::delete().to(catalog_handlers::delete_product_handler))
        .route("/{product_id}/stock", web::post().to(catalog_handlers::adjust_stock_handler)),
    )
    .service(
      web::scope("/orders")
        .route("", web::get().to(order_handlers::admin_list_orders_handler))
        .route("/{order_id}", web::get().to(order_handlers::admin_get_order_handler))
        .route("/{order_id}/status", web::put().to(order_handlers::update_order_status_handler))
        .route("/{order_id}/cancel", web::post().to(order_handlers::cancel_order_handler))
        .route("/{order_id}/shipment", web::put().to(order_handlers::set_shipment_handler))
        .route("/{order_id}/tracking", web::get().to(order_handlers::admin_order_tracking_handler)),
    )
    .service(
      web::scope("/coupons")
        .route("", web::get().to(coupon_handlers::list_coupons_handler))
        .route("", web::post().to(coupon_handlers::create_coupon_handler))
        .route("/{coupon_id}/deactivate", web::post().to(coupon_handlers::deactivate_coupon_handler)),
    )
    .service(
      web::scope("/dashboard")
        .route("/summary", web::get().to(dashboard_handlers::summary_handler))
        .route("/sales", web::get().to(dashboard_handlers::sales_handler))
        .route("/categories", web::get().to(dashboard_handlers::categories_handler))
        .route("/goal", web::get().to(dashboard_handlers::goal_handler))
        .route("/top-products", web::get().to(dashboard_handlers::top_products_handler))
        .route("/low-stock", web::get().to(dashboard_handlers::low_stock_handler)),
    );
}
