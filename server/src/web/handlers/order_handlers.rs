// storefront_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront::model::{OrderId, PageRequest};
use storefront::Gateway;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct ListOrdersQuery {
  pub page: Option<i64>,
  pub page_size: Option<i64>,
}

#[instrument(name = "handler::create_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn create_order_handler<G: Gateway>(
  app_state: web::Data<AppState<G>>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let detail = app_state.orders.create_order(auth_user.user_id).await?;
  info!(
    "Order {} created for user {} with {} items, total {}.",
    detail.order.id,
    auth_user.user_id,
    detail.items.len(),
    detail.order.total_price
  );
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order created.",
      "order": detail
  })))
}

#[instrument(name = "handler::list_orders", skip(app_state, query, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_orders_handler<G: Gateway>(
  app_state: web::Data<AppState<G>>,
  query: web::Query<ListOrdersQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let page = PageRequest::new(query.page, query.page_size);
  let orders = app_state.orders.list_orders(auth_user.user_id, page).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(
    name = "handler::get_order",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.user_id, order_id = %path.as_ref())
)]
pub async fn get_order_handler<G: Gateway>(
  app_state: web::Data<AppState<G>>,
  path: web::Path<OrderId>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let detail = app_state.orders.get_order(auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(
    name = "handler::pay_order",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.user_id, order_id = %path.as_ref())
)]
pub async fn pay_order_handler<G: Gateway>(
  app_state: web::Data<AppState<G>>,
  path: web::Path<OrderId>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders.pay_order(auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order paid.",
      "order": order
  })))
}

#[instrument(
    name = "handler::cancel_order",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.user_id, order_id = %path.as_ref())
)]
pub async fn cancel_order_handler<G: Gateway>(
  app_state: web::Data<AppState<G>>,
  path: web::Path<OrderId>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders.cancel_order(auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order canceled.",
      "order": order
  })))
}
