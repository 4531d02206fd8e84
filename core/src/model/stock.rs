// storefront/src/model/stock.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StockId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
  pub id: StockId,
  pub name: String,
  /// Unit price in minor currency units.
  pub price: i64,
  /// Never negative.
  pub inventory: i64,
  pub category: String,
  pub info: String,
  pub updated_at: DateTime<Utc>,
}

/// Catalog row before it has an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStock {
  pub name: String,
  pub price: i64,
  pub inventory: i64,
  pub category: String,
  pub info: String,
}
