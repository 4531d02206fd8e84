// storefront/src/error.rs
use anyhow::Error as AnyhowError;
use std::fmt;
use thiserror::Error;

use crate::model::{OrderAction, OrderId, OrderStatus, StockId};

/// Every failure the engine can report.
///
/// Callers branch on the variant (or on [`ShopError::kind`]), never on the
/// rendered message.
#[derive(Debug, Error)]
pub enum ShopError {
  /// The entity is absent, or it exists but belongs to another user.
  #[error("{entity} not found")]
  NotFound { entity: Entity },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("insufficient inventory for '{name}' (stock {stock_id}): requested {requested}, available {available}")]
  InsufficientInventory {
    stock_id: StockId,
    name: String,
    requested: i64,
    available: i64,
  },

  #[error("cart is empty")]
  EmptyCart,

  #[error("order {order_id} is {from}; cannot {action}")]
  InvalidTransition {
    order_id: OrderId,
    from: OrderStatus,
    action: OrderAction,
  },

  /// Transient infrastructure failure (lock timeout, lost connection,
  /// constraint race). Safe for the caller to retry.
  #[error("persistence failure during {operation}: {source}")]
  Persistence {
    operation: &'static str,
    #[source]
    source: AnyhowError,
  },
}

/// Closed classification of [`ShopError`], used for transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  NotFound,
  InvalidArgument,
  InsufficientInventory,
  EmptyCart,
  InvalidTransition,
  PersistenceFailure,
}

impl ErrorKind {
  /// Stable machine-readable code.
  pub fn code(self) -> &'static str {
    match self {
      ErrorKind::NotFound => "not_found",
      ErrorKind::InvalidArgument => "invalid_argument",
      ErrorKind::InsufficientInventory => "insufficient_inventory",
      ErrorKind::EmptyCart => "empty_cart",
      ErrorKind::InvalidTransition => "invalid_transition",
      ErrorKind::PersistenceFailure => "persistence_failure",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

/// What a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
  Stock(StockId),
  CartLine(crate::model::CartLineId),
  Order(OrderId),
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Entity::Stock(id) => write!(f, "stock {}", id),
      Entity::CartLine(id) => write!(f, "cart line {}", id),
      Entity::Order(id) => write!(f, "order {}", id),
    }
  }
}

impl ShopError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ShopError::NotFound { .. } => ErrorKind::NotFound,
      ShopError::InvalidArgument(_) => ErrorKind::InvalidArgument,
      ShopError::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
      ShopError::EmptyCart => ErrorKind::EmptyCart,
      ShopError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
      ShopError::Persistence { .. } => ErrorKind::PersistenceFailure,
    }
  }

  /// Only infrastructure failures are worth retrying unchanged.
  pub fn is_retryable(&self) -> bool {
    matches!(self, ShopError::Persistence { .. })
  }

  pub fn not_found(entity: Entity) -> Self {
    ShopError::NotFound { entity }
  }

  pub fn persistence(operation: &'static str, source: impl Into<AnyhowError>) -> Self {
    ShopError::Persistence {
      operation,
      source: source.into(),
    }
  }
}

pub type ShopResult<T, E = ShopError> = std::result::Result<T, E>;
