// storefront/src/main.rs

use std::sync::Arc;

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use storefront::config::AppConfig;
use storefront::errors::AppError;
use storefront::pipelines;
use storefront::services::shipping::HttpShipmentTracker;
use storefront::services::wompi::WompiGateway;
use storefront::state::AppState;
use storefront::web;
use tienda_flow::FlowRegistry;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = Arc::new(AppConfig::from_env().inspect_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
  })?);

  let db_pool = PgPoolOptions::new()
    .max_connections(10)
    .connect(&app_config.database_url)
    .await
    .context("connecting to the database")?;
  tracing::info!("Connected to the database.");

  if app_config.run_migrations {
    sqlx::migrate!("./migrations")
      .run(&db_pool)
      .await
      .context("running database migrations")?;
    tracing::info!("Database migrations applied.");
  }

  let flows = Arc::new(FlowRegistry::<AppError>::new());
  pipelines::register_all_flows(&flows);

  let gateway = WompiGateway::new(app_config.gateway.clone())?;
  let tracker = HttpShipmentTracker::new(
    app_config.shipping_api_base_url.clone(),
    app_config.shipping_api_key.clone(),
  )?;

  let app_state = AppState {
    db_pool,
    flows,
    config: app_config.clone(),
    gateway: Arc::new(gateway),
    tracker: Arc::new(tracker),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("binding {}", server_address))?
  .run()
  .await?;

  Ok(())
}
