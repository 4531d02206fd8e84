// storefront/src/model/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{OrderId, OrderItemId, Stock, StockId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Paid,
  Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
  Pay,
  Cancel,
}

/// Outcome of applying an [`OrderAction`] to an [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// The action was already applied; nothing to write.
  Unchanged,
  MoveTo(OrderStatus),
}

impl OrderStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Paid => "paid",
      OrderStatus::Canceled => "canceled",
    }
  }

  pub fn is_terminal(self) -> bool {
    !matches!(self, OrderStatus::Pending)
  }

  /// The order state machine. `None` means the move is not permitted.
  pub fn transition(self, action: OrderAction) -> Option<Transition> {
    match (self, action) {
      (OrderStatus::Pending, OrderAction::Pay) => Some(Transition::MoveTo(OrderStatus::Paid)),
      (OrderStatus::Pending, OrderAction::Cancel) => Some(Transition::MoveTo(OrderStatus::Canceled)),
      (OrderStatus::Paid, OrderAction::Pay) => Some(Transition::Unchanged),
      (OrderStatus::Canceled, OrderAction::Cancel) => Some(Transition::Unchanged),
      (OrderStatus::Paid, OrderAction::Cancel) | (OrderStatus::Canceled, OrderAction::Pay) => None,
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(OrderStatus::Pending),
      "paid" => Ok(OrderStatus::Paid),
      "canceled" => Ok(OrderStatus::Canceled),
      other => Err(format!("unknown order status '{}'", other)),
    }
  }
}

impl fmt::Display for OrderAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OrderAction::Pay => f.write_str("pay"),
      OrderAction::Cancel => f.write_str("cancel"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub id: OrderId,
  pub user_id: UserId,
  pub status: OrderStatus,
  /// Sum of `price * qty` over the order's items, fixed at creation.
  pub total_price: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of a stock row at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
  pub id: OrderItemId,
  pub order_id: OrderId,
  pub stock_id: StockId,
  pub name: String,
  pub price: i64,
  pub qty: i64,
}

impl OrderItem {
  pub fn line_total(&self) -> Option<i64> {
    self.price.checked_mul(self.qty)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
  pub order_id: OrderId,
  pub stock_id: StockId,
  pub name: String,
  pub price: i64,
  pub qty: i64,
}

impl NewOrderItem {
  /// Copies name and price so later catalog edits leave the order alone.
  pub fn snapshot(order_id: OrderId, stock: &Stock, qty: i64) -> Self {
    NewOrderItem {
      order_id,
      stock_id: stock.id,
      name: stock.name.clone(),
      price: stock.price,
      qty,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItem>,
}

impl OrderDetail {
  pub fn items_total(&self) -> Option<i64> {
    self
      .items
      .iter()
      .try_fold(0i64, |acc, item| acc.checked_add(item.line_total()?))
  }
}
