// storefront_server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront::model::{CartLineId, StockId};
use storefront::Gateway;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub stock_id: StockId,
  /// Missing or non-positive means 1.
  #[serde(default)]
  pub quantity: i64,
}

#[derive(Deserialize, Debug)]
pub struct UpdateQuantityPayload {
  pub quantity: i64,
}

#[instrument(name = "handler::list_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_cart_handler<G: Gateway>(
  app_state: web::Data<AppState<G>>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let entries = app_state.cart.list_items(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(entries))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, stock_id = %req_payload.stock_id, quantity = req_payload.quantity)
)]
pub async fn add_to_cart_handler<G: Gateway>(
  app_state: web::Data<AppState<G>>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let line = app_state
    .cart
    .add_item(auth_user.user_id, req_payload.stock_id, req_payload.quantity)
    .await?;

  info!(
    "Add to cart successful for user: {}. Line ID: {}, Stock ID: {}, New Quantity: {}",
    auth_user.user_id, line.id, line.stock_id, line.quantity
  );

  Ok(HttpResponse::Ok().json(json!({
      "message": "Item added to cart successfully.",
      "cart_line": line
  })))
}

#[instrument(
    name = "handler::update_cart_line",
    skip(app_state, path, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, cart_line_id = %path.as_ref(), quantity = req_payload.quantity)
)]
pub async fn update_cart_line_handler<G: Gateway>(
  app_state: web::Data<AppState<G>>,
  path: web::Path<CartLineId>,
  req_payload: web::Json<UpdateQuantityPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let line = app_state
    .cart
    .update_quantity(auth_user.user_id, path.into_inner(), req_payload.quantity)
    .await?;

  Ok(HttpResponse::Ok().json(json!({
      "message": "Cart quantity updated.",
      "cart_line": line
  })))
}

#[instrument(
    name = "handler::remove_cart_line",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.user_id, cart_line_id = %path.as_ref())
)]
pub async fn remove_cart_line_handler<G: Gateway>(
  app_state: web::Data<AppState<G>>,
  path: web::Path<CartLineId>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state.cart.remove_item(auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Item removed from cart." })))
}
