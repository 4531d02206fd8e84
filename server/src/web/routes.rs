// storefront_server/src/web/routes.rs

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{web, HttpRequest};
use storefront::Gateway;

use crate::errors::AppError;
use crate::web::handlers::{cart_handlers, order_handlers, product_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Undecodable path segments, bodies and query strings all surface as invalid_argument.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::BadRequest(err.to_string()).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
  AppError::BadRequest(err.to_string()).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::BadRequest(err.to_string()).into()
}

/// Mounts the `/api` surface for a given gateway. `main.rs` passes
/// `PgGateway`; tests pass `MemoryGateway`.
pub fn configure_app_routes<G: Gateway>(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(json_error))
    .app_data(web::PathConfig::default().error_handler(path_error))
    .app_data(web::QueryConfig::default().error_handler(query_error))
    .service(
      web::scope("/api")
        .route("/health", web::get().to(health_check_handler))
        .route(
          "/products",
          web::get().to(product_handlers::list_products_handler::<G>),
        )
        .service(
          web::scope("/cart")
            .service(
              web::resource("")
                .route(web::get().to(cart_handlers::list_cart_handler::<G>))
                .route(web::post().to(cart_handlers::add_to_cart_handler::<G>)),
            )
            .service(
              web::resource("/{id}")
                .route(web::put().to(cart_handlers::update_cart_line_handler::<G>))
                .route(web::delete().to(cart_handlers::remove_cart_line_handler::<G>)),
            ),
        )
        .service(
          web::scope("/orders")
            .service(
              web::resource("")
                .route(web::post().to(order_handlers::create_order_handler::<G>))
                .route(web::get().to(order_handlers::list_orders_handler::<G>)),
            )
            .route("/{id}", web::get().to(order_handlers::get_order_handler::<G>))
            .route("/{id}/pay", web::post().to(order_handlers::pay_order_handler::<G>))
            .route("/{id}/cancel", web::post().to(order_handlers::cancel_order_handler::<G>)),
        ),
    );
}
