// storefront_server/src/web/extractors.rs

use actix_web::{FromRequest, HttpRequest};
use storefront::model::UserId;
use tracing::warn;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// The caller's identity as asserted by the authenticating proxy in front of
/// this service. Ids are positive.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: UserId,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let parsed = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|value| value.to_str().ok())
      .and_then(|raw| raw.trim().parse::<i64>().ok())
      .filter(|id| *id > 0);

    match parsed {
      Some(raw) => futures_util::future::ready(Ok(AuthenticatedUser { user_id: UserId(raw) })),
      None => {
        warn!("AuthenticatedUser extractor: Missing or invalid X-User-ID header.");
        futures_util::future::ready(Err(AppError::Auth(
          "User authentication required. Missing or invalid X-User-ID header.".to_string(),
        )))
      }
    }
  }
}
