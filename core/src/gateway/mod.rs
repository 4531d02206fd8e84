// storefront/src/gateway/mod.rs

//! The persistence contract the engine is written against.
//!
//! A [`Gateway`] hands out owned [`Transaction`]s. A transaction is a scoped
//! resource: every lock it takes is held until it ends, [`Transaction::commit`]
//! consumes it, and dropping it without committing rolls everything back.
//! Reads on the gateway itself never lock and only see committed data.

pub mod memory;

use async_trait::async_trait;

use crate::error::ShopResult;
use crate::model::{
  CartEntry, CartLine, CartLineId, NewOrderItem, NewStock, Order, OrderId, OrderItem, OrderStatus, Stock, StockId,
  UserId,
};

pub use memory::MemoryGateway;

#[async_trait]
pub trait Gateway: Send + Sync + 'static {
  type Tx: Transaction;

  async fn begin(&self) -> ShopResult<Self::Tx>;

  async fn stock(&self, id: StockId) -> ShopResult<Option<Stock>>;

  /// Newest first.
  async fn stocks(&self) -> ShopResult<Vec<Stock>>;

  /// Catalog seeding. The admin catalog surface lives elsewhere.
  async fn insert_stock(&self, new: NewStock) -> ShopResult<Stock>;

  /// The user's lines joined with their stock rows, most recently added first.
  async fn cart_entries(&self, user: UserId) -> ShopResult<Vec<CartEntry>>;

  /// Deletes the line only if it belongs to `user`. Returns whether a row went away.
  async fn delete_cart_line(&self, user: UserId, line: CartLineId) -> ShopResult<bool>;

  async fn order(&self, user: UserId, id: OrderId) -> ShopResult<Option<Order>>;

  async fn order_items(&self, order: OrderId) -> ShopResult<Vec<OrderItem>>;

  async fn count_orders(&self, user: UserId) -> ShopResult<i64>;

  /// Newest first.
  async fn orders_page(&self, user: UserId, offset: i64, limit: i64) -> ShopResult<Vec<Order>>;
}

/// One atomic unit of work. Methods named `lock_*` take an exclusive row lock
/// that blocks until any other holder finishes, bounded by the gateway's lock
/// timeout (a timeout is a retryable `ShopError::Persistence`).
#[async_trait]
pub trait Transaction: Send + Sized {
  async fn lock_stock(&mut self, id: StockId) -> ShopResult<Option<Stock>>;

  /// Stock row must already be locked by this transaction.
  async fn write_inventory(&mut self, id: StockId, inventory: i64) -> ShopResult<()>;

  /// Locks the (user, stock) cart slot whether or not a line occupies it.
  async fn lock_cart_line(&mut self, user: UserId, stock: StockId) -> ShopResult<Option<CartLine>>;

  /// Ownership-filtered: a line owned by someone else reads as `None`.
  async fn lock_cart_line_by_id(&mut self, user: UserId, line: CartLineId) -> ShopResult<Option<CartLine>>;

  /// Locks every line the user currently has; ascending stock id.
  async fn lock_cart(&mut self, user: UserId) -> ShopResult<Vec<CartLine>>;

  async fn insert_cart_line(&mut self, user: UserId, stock: StockId, quantity: i64) -> ShopResult<CartLine>;

  async fn write_cart_quantity(&mut self, line: CartLineId, quantity: i64) -> ShopResult<()>;

  async fn delete_cart_lines(&mut self, user: UserId, lines: &[CartLineId]) -> ShopResult<u64>;

  /// New `pending` order with a zero total.
  async fn insert_order(&mut self, user: UserId) -> ShopResult<Order>;

  async fn insert_order_item(&mut self, item: NewOrderItem) -> ShopResult<OrderItem>;

  /// Returns the row as it will be committed.
  async fn write_order_total(&mut self, order: OrderId, total: i64) -> ShopResult<Order>;

  /// Ownership-filtered like [`Transaction::lock_cart_line_by_id`].
  async fn lock_order(&mut self, user: UserId, id: OrderId) -> ShopResult<Option<Order>>;

  async fn write_order_status(&mut self, order: OrderId, status: OrderStatus) -> ShopResult<Order>;

  async fn order_items(&mut self, order: OrderId) -> ShopResult<Vec<OrderItem>>;

  async fn commit(self) -> ShopResult<()>;

  /// Explicit rollback. Dropping the transaction has the same effect.
  async fn rollback(self) -> ShopResult<()>;
}
