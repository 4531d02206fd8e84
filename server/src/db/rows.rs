// storefront_server/src/db/rows.rs

//! Row shapes as sqlx reads them, converted into the engine's model types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use storefront::model::{
  CartEntry, CartLine, CartLineId, Order, OrderId, OrderItem, OrderItemId, OrderStatus, Stock, StockId, UserId,
};
use storefront::ShopError;

#[derive(Debug, FromRow)]
pub struct StockRow {
  pub id: i64,
  pub name: String,
  pub price: i64,
  pub inventory: i64,
  pub category: String,
  pub info: String,
  pub updated_at: DateTime<Utc>,
}

impl From<StockRow> for Stock {
  fn from(row: StockRow) -> Self {
    Stock {
      id: StockId(row.id),
      name: row.name,
      price: row.price,
      inventory: row.inventory,
      category: row.category,
      info: row.info,
      updated_at: row.updated_at,
    }
  }
}

#[derive(Debug, FromRow)]
pub struct CartLineRow {
  pub id: i64,
  pub user_id: i64,
  pub stock_id: i64,
  pub quantity: i64,
  pub added_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
  fn from(row: CartLineRow) -> Self {
    CartLine {
      id: CartLineId(row.id),
      user_id: UserId(row.user_id),
      stock_id: StockId(row.stock_id),
      quantity: row.quantity,
      added_at: row.added_at,
    }
  }
}

/// A cart line joined with its stock row; stock columns carry an `s_` prefix.
#[derive(Debug, FromRow)]
pub struct CartEntryRow {
  pub id: i64,
  pub user_id: i64,
  pub stock_id: i64,
  pub quantity: i64,
  pub added_at: DateTime<Utc>,
  pub s_name: String,
  pub s_price: i64,
  pub s_inventory: i64,
  pub s_category: String,
  pub s_info: String,
  pub s_updated_at: DateTime<Utc>,
}

impl From<CartEntryRow> for CartEntry {
  fn from(row: CartEntryRow) -> Self {
    CartEntry {
      stock: Stock {
        id: StockId(row.stock_id),
        name: row.s_name,
        price: row.s_price,
        inventory: row.s_inventory,
        category: row.s_category,
        info: row.s_info,
        updated_at: row.s_updated_at,
      },
      line: CartLine {
        id: CartLineId(row.id),
        user_id: UserId(row.user_id),
        stock_id: StockId(row.stock_id),
        quantity: row.quantity,
        added_at: row.added_at,
      },
    }
  }
}

#[derive(Debug, FromRow)]
pub struct OrderRow {
  pub id: i64,
  pub user_id: i64,
  pub status: String,
  pub total_price: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = ShopError;

  fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
    let status: OrderStatus = row
      .status
      .parse()
      .map_err(|e: String| ShopError::persistence("decode order row", anyhow::anyhow!(e)))?;
    Ok(Order {
      id: OrderId(row.id),
      user_id: UserId(row.user_id),
      status,
      total_price: row.total_price,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Debug, FromRow)]
pub struct OrderItemRow {
  pub id: i64,
  pub order_id: i64,
  pub stock_id: i64,
  pub name: String,
  pub price: i64,
  pub qty: i64,
}

impl From<OrderItemRow> for OrderItem {
  fn from(row: OrderItemRow) -> Self {
    OrderItem {
      id: OrderItemId(row.id),
      order_id: OrderId(row.order_id),
      stock_id: StockId(row.stock_id),
      name: row.name,
      price: row.price,
      qty: row.qty,
    }
  }
}

pub fn into_order(row: Option<OrderRow>) -> Result<Option<Order>, ShopError> {
  row.map(Order::try_from).transpose()
}
