// storefront_server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront::{ErrorKind, ShopError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Domain(#[from] ShopError),

  /// Request could not be decoded (bad path segment, JSON body or query).
  #[error("Invalid request: {0}")]
  BadRequest(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),
}

impl AppError {
  /// Machine-readable code for the `error` field of the response body.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::Domain(err) => err.kind().code(),
      AppError::BadRequest(_) => ErrorKind::InvalidArgument.code(),
      AppError::Auth(_) => "unauthenticated",
      AppError::Sqlx(_) => ErrorKind::PersistenceFailure.code(),
      AppError::Config(_) => "internal",
    }
  }

  pub fn is_retryable(&self) -> bool {
    match self {
      AppError::Domain(err) => err.is_retryable(),
      AppError::Sqlx(_) => true,
      _ => false,
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Domain(err) => match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument
        | ErrorKind::InsufficientInventory
        | ErrorKind::EmptyCart
        | ErrorKind::InvalidTransition => StatusCode::BAD_REQUEST,
        ErrorKind::PersistenceFailure => StatusCode::SERVICE_UNAVAILABLE,
      },
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Sqlx(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, status = status.as_u16(), "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Rejecting request");
    }

    // Storage and config details stay in the logs.
    let message = match self {
      AppError::Sqlx(_) => "Database operation failed".to_string(),
      AppError::Config(_) => "Configuration issue".to_string(),
      other => other.to_string(),
    };

    HttpResponse::build(status).json(json!({
      "error": self.code(),
      "message": message,
      "retryable": self.is_retryable(),
    }))
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
