// storefront_server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use storefront::Gateway;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

/// Public catalog, newest first. No authentication.
#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler<G: Gateway>(app_state: web::Data<AppState<G>>) -> Result<HttpResponse, AppError> {
  let products = app_state.ledger.list().await?;
  info!("Successfully fetched {} products.", products.len());
  Ok(HttpResponse::Ok().json(products))
}
