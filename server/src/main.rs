// storefront_server/src/main.rs

use std::sync::Arc;

use actix_web::{web as actix_data, App, HttpServer}; // Renamed web to actix_data
use anyhow::Context;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing
use tracing_subscriber::EnvFilter;

use storefront_server::config::AppConfig;
use storefront_server::db::{seed_catalog, PgGateway};
use storefront_server::state::AppState;
use storefront_server::web::configure_app_routes;

fn init_tracing(json: bool) {
  let builder = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE); // Log when spans close, showing duration
  if json {
    builder.json().init();
  } else {
    builder.init();
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;
  init_tracing(app_config.log_json);

  tracing::info!(
    bind = %app_config.bind_address(),
    lock_timeout_ms = app_config.lock_timeout.as_millis() as u64,
    "Starting storefront server..."
  );

  let gateway = PgGateway::connect(&app_config)
    .await
    .context("Database connection error")?;
  gateway.migrate().await.context("Database migration failed")?;

  if app_config.seed_db {
    seed_catalog(&gateway)
      .await
      .context("Seeding the demo catalog failed")?;
  }

  let app_state = AppState::new(Arc::new(gateway));

  let server_address = app_config.bind_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(configure_app_routes::<PgGateway>)
  })
  .bind(&server_address)?
  .run()
  .await?;

  Ok(())
}
