// storefront_server/src/db/pg_gateway.rs

//! [`Gateway`] over PostgreSQL.
//!
//! Row locks are `SELECT ... FOR UPDATE`. An empty cart slot has no row to
//! lock, so slots are additionally guarded by a transaction-scoped advisory
//! lock keyed on (user, stock). Every transaction sets `lock_timeout`, so a
//! lock wait ends in SQLSTATE 55P03 instead of hanging.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use storefront::gateway::{Gateway, Transaction};
use storefront::model::{
  CartEntry, CartLine, CartLineId, NewOrderItem, NewStock, Order, OrderId, OrderItem, OrderStatus, Stock, StockId,
  UserId,
};
use storefront::{Entity, ShopError, ShopResult};
use tracing::{debug, error, info, warn};

use super::rows::{into_order, CartEntryRow, CartLineRow, OrderItemRow, OrderRow, StockRow};
use crate::config::AppConfig;
use crate::errors::Result as AppResult;

/// lock_not_available, deadlock_detected, serialization_failure, unique_violation
const CONTENTION_CODES: [&str; 4] = ["55P03", "40P01", "40001", "23505"];

pub(crate) fn map_sqlx_error(error: sqlx::Error, operation: &'static str) -> ShopError {
  let code = match &error {
    sqlx::Error::Database(db_error) => db_error.code().map(|code| code.into_owned()),
    _ => None,
  };
  match code.as_deref() {
    Some(code) if CONTENTION_CODES.contains(&code) => {
      warn!(error = %error, code, operation, "[postgres.contention] lock or constraint conflict");
    }
    _ => {
      error!(error = %error, operation, "[postgres.database_error] database operation failed");
    }
  }
  ShopError::persistence(operation, error)
}

#[derive(Clone)]
pub struct PgGateway {
  pool: PgPool,
  lock_timeout: Duration,
}

impl PgGateway {
  pub async fn connect(config: &AppConfig) -> AppResult<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(config.db_max_connections)
      .acquire_timeout(config.db_acquire_timeout)
      .connect(&config.database_url)
      .await?;
    info!(max_connections = config.db_max_connections, "Database pool ready.");
    Ok(Self::from_pool(pool, config.lock_timeout))
  }

  pub fn from_pool(pool: PgPool, lock_timeout: Duration) -> Self {
    PgGateway { pool, lock_timeout }
  }

  pub async fn migrate(&self) -> AppResult<()> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(sqlx::Error::from)?;
    info!("Database migrations applied.");
    Ok(())
  }
}

#[async_trait]
impl Gateway for PgGateway {
  type Tx = PgTx;

  async fn begin(&self) -> ShopResult<PgTx> {
    let mut tx = self
      .pool
      .begin()
      .await
      .map_err(|e| map_sqlx_error(e, "begin transaction"))?;
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
      .bind(format!("{}ms", self.lock_timeout.as_millis()))
      .execute(&mut *tx)
      .await
      .map_err(|e| map_sqlx_error(e, "set lock timeout"))?;
    Ok(PgTx { tx })
  }

  async fn stock(&self, id: StockId) -> ShopResult<Option<Stock>> {
    let row: Option<StockRow> = sqlx::query_as(
      "SELECT id, name, price, inventory, category, info, updated_at FROM stocks WHERE id = $1",
    )
    .bind(id.get())
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| map_sqlx_error(e, "fetch stock"))?;
    Ok(row.map(Stock::from))
  }

  async fn stocks(&self) -> ShopResult<Vec<Stock>> {
    let rows: Vec<StockRow> = sqlx::query_as(
      "SELECT id, name, price, inventory, category, info, updated_at FROM stocks ORDER BY id DESC",
    )
    .fetch_all(&self.pool)
    .await
    .map_err(|e| map_sqlx_error(e, "list stocks"))?;
    Ok(rows.into_iter().map(Stock::from).collect())
  }

  async fn insert_stock(&self, new: NewStock) -> ShopResult<Stock> {
    let row: StockRow = sqlx::query_as(
      "INSERT INTO stocks (name, price, inventory, category, info) VALUES ($1, $2, $3, $4, $5) \
       RETURNING id, name, price, inventory, category, info, updated_at",
    )
    .bind(new.name)
    .bind(new.price)
    .bind(new.inventory)
    .bind(new.category)
    .bind(new.info)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| map_sqlx_error(e, "insert stock"))?;
    Ok(row.into())
  }

  async fn cart_entries(&self, user: UserId) -> ShopResult<Vec<CartEntry>> {
    let rows: Vec<CartEntryRow> = sqlx::query_as(
      "SELECT c.id, c.user_id, c.stock_id, c.quantity, c.added_at, \
              s.name AS s_name, s.price AS s_price, s.inventory AS s_inventory, \
              s.category AS s_category, s.info AS s_info, s.updated_at AS s_updated_at \
       FROM cart_lines c JOIN stocks s ON s.id = c.stock_id \
       WHERE c.user_id = $1 ORDER BY c.id DESC",
    )
    .bind(user.get())
    .fetch_all(&self.pool)
    .await
    .map_err(|e| map_sqlx_error(e, "list cart"))?;
    Ok(rows.into_iter().map(CartEntry::from).collect())
  }

  async fn delete_cart_line(&self, user: UserId, line: CartLineId) -> ShopResult<bool> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE id = $1 AND user_id = $2")
      .bind(line.get())
      .bind(user.get())
      .execute(&self.pool)
      .await
      .map_err(|e| map_sqlx_error(e, "delete cart line"))?;
    Ok(result.rows_affected() > 0)
  }

  async fn order(&self, user: UserId, id: OrderId) -> ShopResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(
      "SELECT id, user_id, status, total_price, created_at, updated_at FROM orders \
       WHERE id = $1 AND user_id = $2",
    )
    .bind(id.get())
    .bind(user.get())
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| map_sqlx_error(e, "fetch order"))?;
    into_order(row)
  }

  async fn order_items(&self, order: OrderId) -> ShopResult<Vec<OrderItem>> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
      "SELECT id, order_id, stock_id, name, price, qty FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order.get())
    .fetch_all(&self.pool)
    .await
    .map_err(|e| map_sqlx_error(e, "fetch order items"))?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
  }

  async fn count_orders(&self, user: UserId) -> ShopResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = $1")
      .bind(user.get())
      .fetch_one(&self.pool)
      .await
      .map_err(|e| map_sqlx_error(e, "count orders"))
  }

  async fn orders_page(&self, user: UserId, offset: i64, limit: i64) -> ShopResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(
      "SELECT id, user_id, status, total_price, created_at, updated_at FROM orders \
       WHERE user_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
    )
    .bind(user.get())
    .bind(limit)
    .bind(offset)
    .fetch_all(&self.pool)
    .await
    .map_err(|e| map_sqlx_error(e, "list orders"))?;
    rows.into_iter().map(Order::try_from).collect()
  }
}

/// Dropping an unfinished `PgTx` drops the sqlx transaction, which rolls back.
pub struct PgTx {
  tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTx {
  async fn lock_stock(&mut self, id: StockId) -> ShopResult<Option<Stock>> {
    let row: Option<StockRow> = sqlx::query_as(
      "SELECT id, name, price, inventory, category, info, updated_at FROM stocks WHERE id = $1 FOR UPDATE",
    )
    .bind(id.get())
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "lock stock"))?;
    Ok(row.map(Stock::from))
  }

  async fn write_inventory(&mut self, id: StockId, inventory: i64) -> ShopResult<()> {
    sqlx::query("UPDATE stocks SET inventory = $2, updated_at = now() WHERE id = $1")
      .bind(id.get())
      .bind(inventory)
      .execute(&mut *self.tx)
      .await
      .map_err(|e| map_sqlx_error(e, "write inventory"))?;
    Ok(())
  }

  async fn lock_cart_line(&mut self, user: UserId, stock: StockId) -> ShopResult<Option<CartLine>> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
      .bind(format!("cart_lines/{}:{}", user, stock))
      .execute(&mut *self.tx)
      .await
      .map_err(|e| map_sqlx_error(e, "lock cart slot"))?;
    let row: Option<CartLineRow> = sqlx::query_as(
      "SELECT id, user_id, stock_id, quantity, added_at FROM cart_lines \
       WHERE user_id = $1 AND stock_id = $2 FOR UPDATE",
    )
    .bind(user.get())
    .bind(stock.get())
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "lock cart line"))?;
    debug!(user_id = %user, stock_id = %stock, occupied = row.is_some(), "cart slot locked");
    Ok(row.map(CartLine::from))
  }

  async fn lock_cart_line_by_id(&mut self, user: UserId, line: CartLineId) -> ShopResult<Option<CartLine>> {
    let row: Option<CartLineRow> = sqlx::query_as(
      "SELECT id, user_id, stock_id, quantity, added_at FROM cart_lines \
       WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(line.get())
    .bind(user.get())
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "lock cart line"))?;
    Ok(row.map(CartLine::from))
  }

  async fn lock_cart(&mut self, user: UserId) -> ShopResult<Vec<CartLine>> {
    // Rows are locked in the ORDER BY order.
    let rows: Vec<CartLineRow> = sqlx::query_as(
      "SELECT id, user_id, stock_id, quantity, added_at FROM cart_lines \
       WHERE user_id = $1 ORDER BY stock_id FOR UPDATE",
    )
    .bind(user.get())
    .fetch_all(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "lock cart"))?;
    Ok(rows.into_iter().map(CartLine::from).collect())
  }

  async fn insert_cart_line(&mut self, user: UserId, stock: StockId, quantity: i64) -> ShopResult<CartLine> {
    let row: CartLineRow = sqlx::query_as(
      "INSERT INTO cart_lines (user_id, stock_id, quantity) VALUES ($1, $2, $3) \
       RETURNING id, user_id, stock_id, quantity, added_at",
    )
    .bind(user.get())
    .bind(stock.get())
    .bind(quantity)
    .fetch_one(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "insert cart line"))?;
    Ok(row.into())
  }

  async fn write_cart_quantity(&mut self, line: CartLineId, quantity: i64) -> ShopResult<()> {
    let result = sqlx::query("UPDATE cart_lines SET quantity = $2 WHERE id = $1")
      .bind(line.get())
      .bind(quantity)
      .execute(&mut *self.tx)
      .await
      .map_err(|e| map_sqlx_error(e, "write cart quantity"))?;
    if result.rows_affected() == 0 {
      return Err(ShopError::not_found(Entity::CartLine(line)));
    }
    Ok(())
  }

  async fn delete_cart_lines(&mut self, user: UserId, lines: &[CartLineId]) -> ShopResult<u64> {
    let ids: Vec<i64> = lines.iter().map(|line| line.get()).collect();
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND id = ANY($2)")
      .bind(user.get())
      .bind(ids)
      .execute(&mut *self.tx)
      .await
      .map_err(|e| map_sqlx_error(e, "delete cart lines"))?;
    Ok(result.rows_affected())
  }

  async fn insert_order(&mut self, user: UserId) -> ShopResult<Order> {
    let row: OrderRow = sqlx::query_as(
      "INSERT INTO orders (user_id, status, total_price) VALUES ($1, 'pending', 0) \
       RETURNING id, user_id, status, total_price, created_at, updated_at",
    )
    .bind(user.get())
    .fetch_one(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "insert order"))?;
    row.try_into()
  }

  async fn insert_order_item(&mut self, item: NewOrderItem) -> ShopResult<OrderItem> {
    let row: OrderItemRow = sqlx::query_as(
      "INSERT INTO order_items (order_id, stock_id, name, price, qty) VALUES ($1, $2, $3, $4, $5) \
       RETURNING id, order_id, stock_id, name, price, qty",
    )
    .bind(item.order_id.get())
    .bind(item.stock_id.get())
    .bind(item.name)
    .bind(item.price)
    .bind(item.qty)
    .fetch_one(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "insert order item"))?;
    Ok(row.into())
  }

  async fn write_order_total(&mut self, order: OrderId, total: i64) -> ShopResult<Order> {
    let row: Option<OrderRow> = sqlx::query_as(
      "UPDATE orders SET total_price = $2, updated_at = now() WHERE id = $1 \
       RETURNING id, user_id, status, total_price, created_at, updated_at",
    )
    .bind(order.get())
    .bind(total)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "write order total"))?;
    into_order(row)?.ok_or_else(|| ShopError::not_found(Entity::Order(order)))
  }

  async fn lock_order(&mut self, user: UserId, id: OrderId) -> ShopResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(
      "SELECT id, user_id, status, total_price, created_at, updated_at FROM orders \
       WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(id.get())
    .bind(user.get())
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "lock order"))?;
    into_order(row)
  }

  async fn write_order_status(&mut self, order: OrderId, status: OrderStatus) -> ShopResult<Order> {
    let row: Option<OrderRow> = sqlx::query_as(
      "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 \
       RETURNING id, user_id, status, total_price, created_at, updated_at",
    )
    .bind(order.get())
    .bind(status.as_str())
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "write order status"))?;
    into_order(row)?.ok_or_else(|| ShopError::not_found(Entity::Order(order)))
  }

  async fn order_items(&mut self, order: OrderId) -> ShopResult<Vec<OrderItem>> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
      "SELECT id, order_id, stock_id, name, price, qty FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order.get())
    .fetch_all(&mut *self.tx)
    .await
    .map_err(|e| map_sqlx_error(e, "fetch order items"))?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
  }

  async fn commit(self) -> ShopResult<()> {
    self
      .tx
      .commit()
      .await
      .map_err(|e| map_sqlx_error(e, "commit"))
  }

  async fn rollback(self) -> ShopResult<()> {
    self
      .tx
      .rollback()
      .await
      .map_err(|e| map_sqlx_error(e, "rollback"))
  }
}
