// storefront/src/model/cart_line.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CartLineId, Stock, StockId, UserId};

/// One pending selection. Unique per (user_id, stock_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
  pub id: CartLineId,
  pub user_id: UserId,
  pub stock_id: StockId,
  /// Always positive.
  pub quantity: i64,
  pub added_at: DateTime<Utc>,
}

/// A cart line joined with the current catalog row, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
  #[serde(flatten)]
  pub line: CartLine,
  pub stock: Stock,
}
