// storefront/src/gateway/memory.rs

//! In-process [`Gateway`] for tests, benchmarks and local runs.
//!
//! Row locks are per-key `tokio::sync::Mutex<()>`s whose owned guards live in
//! the transaction, so they are released exactly when the transaction ends.
//! Writes are staged inside the transaction and applied to the shared tables
//! in one step on commit; a transaction that is dropped leaves no trace.
//! Plain reads through the gateway see committed rows only.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};
use tracing::{debug, trace, warn};

use super::{Gateway, Transaction};
use crate::error::{Entity, ShopError, ShopResult};
use crate::model::{
  CartEntry, CartLine, CartLineId, NewOrderItem, NewStock, Order, OrderId, OrderItem, OrderItemId, OrderStatus, Stock,
  StockId, UserId,
};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
  Stock(StockId),
  /// The (user, stock) slot a cart line occupies, locked even while empty so
  /// concurrent inserts for the same slot serialize.
  CartSlot(UserId, StockId),
  Order(OrderId),
}

impl fmt::Display for RowKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RowKey::Stock(id) => write!(f, "stocks/{}", id),
      RowKey::CartSlot(user, stock) => write!(f, "cart_lines/{}:{}", user, stock),
      RowKey::Order(id) => write!(f, "orders/{}", id),
    }
  }
}

#[derive(Default)]
struct Tables {
  stocks: BTreeMap<StockId, Stock>,
  cart_lines: BTreeMap<CartLineId, CartLine>,
  orders: BTreeMap<OrderId, Order>,
  order_items: BTreeMap<OrderItemId, OrderItem>,
}

impl Tables {
  fn cart_lines_of(&self, user: UserId) -> impl Iterator<Item = &CartLine> {
    self.cart_lines.values().filter(move |line| line.user_id == user)
  }
}

/// Id sequences are not transactional, like database sequences: ids taken by
/// a rolled-back transaction are simply skipped.
#[derive(Default)]
struct Sequences {
  stock: AtomicI64,
  cart_line: AtomicI64,
  order: AtomicI64,
  order_item: AtomicI64,
}

fn next(seq: &AtomicI64) -> i64 {
  seq.fetch_add(1, Ordering::SeqCst) + 1
}

struct Shared {
  tables: RwLock<Tables>,
  row_locks: Mutex<HashMap<RowKey, Arc<RowMutex<()>>>>,
  seq: Sequences,
  lock_timeout: Duration,
}

impl Shared {
  fn row_lock(&self, key: RowKey) -> Arc<RowMutex<()>> {
    self
      .row_locks
      .lock()
      .entry(key)
      .or_insert_with(|| Arc::new(RowMutex::new(())))
      .clone()
  }

  /// Drops registry entries for `keys` that nobody holds or waits on. The
  /// caller must already have released its own guards.
  fn forget_idle(&self, keys: impl IntoIterator<Item = RowKey>) {
    let mut registry = self.row_locks.lock();
    for key in keys {
      if registry.get(&key).is_some_and(|row| Arc::strong_count(row) == 1) {
        registry.remove(&key);
      }
    }
  }
}

#[derive(Clone)]
pub struct MemoryGateway {
  shared: Arc<Shared>,
}

impl MemoryGateway {
  pub fn new() -> Self {
    Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
  }

  /// How long a transaction waits for a row lock before failing with a
  /// retryable persistence error.
  pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
    MemoryGateway {
      shared: Arc::new(Shared {
        tables: RwLock::new(Tables::default()),
        row_locks: Mutex::new(HashMap::new()),
        seq: Sequences::default(),
        lock_timeout,
      }),
    }
  }

  /// Catalog edit in the style of the admin surface: applied directly,
  /// without taking the row lock. Inventory must stay non-negative.
  pub fn edit_stock(&self, id: StockId, edit: impl FnOnce(&mut Stock)) -> ShopResult<Stock> {
    let mut tables = self.shared.tables.write();
    let row = tables
      .stocks
      .get_mut(&id)
      .ok_or_else(|| ShopError::not_found(Entity::Stock(id)))?;
    let mut edited = row.clone();
    edit(&mut edited);
    if edited.inventory < 0 {
      return Err(ShopError::InvalidArgument(format!(
        "inventory of stock {} cannot be negative",
        id
      )));
    }
    edited.id = id;
    edited.updated_at = Utc::now();
    *row = edited.clone();
    Ok(edited)
  }

  /// Removes a catalog row directly, like the admin surface. Cart lines for
  /// the stock go with it; order items keep their snapshot.
  pub fn delete_stock(&self, id: StockId) -> ShopResult<Stock> {
    let mut tables = self.shared.tables.write();
    let removed = tables
      .stocks
      .remove(&id)
      .ok_or_else(|| ShopError::not_found(Entity::Stock(id)))?;
    tables.cart_lines.retain(|_, line| line.stock_id != id);
    Ok(removed)
  }
}

impl Default for MemoryGateway {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Gateway for MemoryGateway {
  type Tx = MemoryTx;

  async fn begin(&self) -> ShopResult<MemoryTx> {
    trace!("memory transaction started");
    Ok(MemoryTx::new(Arc::clone(&self.shared)))
  }

  async fn stock(&self, id: StockId) -> ShopResult<Option<Stock>> {
    Ok(self.shared.tables.read().stocks.get(&id).cloned())
  }

  async fn stocks(&self) -> ShopResult<Vec<Stock>> {
    Ok(self.shared.tables.read().stocks.values().rev().cloned().collect())
  }

  async fn insert_stock(&self, new: NewStock) -> ShopResult<Stock> {
    if new.inventory < 0 || new.price < 0 {
      return Err(ShopError::InvalidArgument(
        "price and inventory must be non-negative".to_string(),
      ));
    }
    let stock = Stock {
      id: StockId(next(&self.shared.seq.stock)),
      name: new.name,
      price: new.price,
      inventory: new.inventory,
      category: new.category,
      info: new.info,
      updated_at: Utc::now(),
    };
    self.shared.tables.write().stocks.insert(stock.id, stock.clone());
    Ok(stock)
  }

  async fn cart_entries(&self, user: UserId) -> ShopResult<Vec<CartEntry>> {
    let tables = self.shared.tables.read();
    let mut entries: Vec<CartEntry> = tables
      .cart_lines_of(user)
      .filter_map(|line| {
        tables.stocks.get(&line.stock_id).map(|stock| CartEntry {
          line: line.clone(),
          stock: stock.clone(),
        })
      })
      .collect();
    entries.sort_by(|a, b| b.line.id.cmp(&a.line.id));
    Ok(entries)
  }

  async fn delete_cart_line(&self, user: UserId, line: CartLineId) -> ShopResult<bool> {
    // Goes through the slot lock so it waits out a checkout holding the line.
    let mut tx = self.begin().await?;
    let Some(found) = tx.lock_cart_line_by_id(user, line).await? else {
      return Ok(false);
    };
    tx.delete_cart_lines(user, &[found.id]).await?;
    tx.commit().await?;
    Ok(true)
  }

  async fn order(&self, user: UserId, id: OrderId) -> ShopResult<Option<Order>> {
    Ok(
      self
        .shared
        .tables
        .read()
        .orders
        .get(&id)
        .filter(|order| order.user_id == user)
        .cloned(),
    )
  }

  async fn order_items(&self, order: OrderId) -> ShopResult<Vec<OrderItem>> {
    Ok(
      self
        .shared
        .tables
        .read()
        .order_items
        .values()
        .filter(|item| item.order_id == order)
        .cloned()
        .collect(),
    )
  }

  async fn count_orders(&self, user: UserId) -> ShopResult<i64> {
    let count = self
      .shared
      .tables
      .read()
      .orders
      .values()
      .filter(|order| order.user_id == user)
      .count();
    Ok(count as i64)
  }

  async fn orders_page(&self, user: UserId, offset: i64, limit: i64) -> ShopResult<Vec<Order>> {
    let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    Ok(
      self
        .shared
        .tables
        .read()
        .orders
        .values()
        .rev()
        .filter(|order| order.user_id == user)
        .skip(offset)
        .take(limit)
        .cloned()
        .collect(),
    )
  }
}

pub struct MemoryTx {
  shared: Arc<Shared>,
  held: HashMap<RowKey, OwnedMutexGuard<()>>,
  inventory_writes: BTreeMap<StockId, i64>,
  /// Orders locked or created here, with pending edits applied.
  orders: BTreeMap<OrderId, Order>,
  cart_upserts: BTreeMap<CartLineId, CartLine>,
  cart_deletes: BTreeSet<CartLineId>,
  new_items: Vec<OrderItem>,
  finished: bool,
}

impl MemoryTx {
  fn new(shared: Arc<Shared>) -> Self {
    MemoryTx {
      shared,
      held: HashMap::new(),
      inventory_writes: BTreeMap::new(),
      orders: BTreeMap::new(),
      cart_upserts: BTreeMap::new(),
      cart_deletes: BTreeSet::new(),
      new_items: Vec::new(),
      finished: false,
    }
  }

  async fn acquire(&mut self, key: RowKey) -> ShopResult<()> {
    if self.held.contains_key(&key) {
      return Ok(());
    }
    let row = self.shared.row_lock(key);
    let timeout = self.shared.lock_timeout;
    trace!(row = %key, "waiting for row lock");
    match tokio::time::timeout(timeout, row.lock_owned()).await {
      Ok(guard) => {
        debug!(row = %key, "row lock acquired");
        self.held.insert(key, guard);
        Ok(())
      }
      Err(_) => {
        warn!(row = %key, timeout_ms = timeout.as_millis() as u64, "row lock wait timed out");
        Err(ShopError::persistence(
          "acquire row lock",
          anyhow!("timed out after {:?} waiting for {}", timeout, key),
        ))
      }
    }
  }

  fn holds(&self, key: RowKey) -> bool {
    self.held.contains_key(&key)
  }

  /// Committed lines of `user` with this transaction's edits layered on top.
  fn visible_cart_lines(&self, user: UserId) -> Vec<CartLine> {
    let mut lines: BTreeMap<CartLineId, CartLine> = {
      let tables = self.shared.tables.read();
      tables.cart_lines_of(user).map(|line| (line.id, line.clone())).collect()
    };
    for (id, line) in &self.cart_upserts {
      if line.user_id == user {
        lines.insert(*id, line.clone());
      }
    }
    for id in &self.cart_deletes {
      lines.remove(id);
    }
    lines.into_values().collect()
  }

  fn committed_order(&self, id: OrderId) -> Option<Order> {
    self.shared.tables.read().orders.get(&id).cloned()
  }

  fn order_mut(&mut self, id: OrderId, operation: &'static str) -> ShopResult<&mut Order> {
    self
      .orders
      .get_mut(&id)
      .ok_or_else(|| ShopError::persistence(operation, anyhow!("order {} is not locked by this transaction", id)))
  }
}

#[async_trait]
impl Transaction for MemoryTx {
  async fn lock_stock(&mut self, id: StockId) -> ShopResult<Option<Stock>> {
    self.acquire(RowKey::Stock(id)).await?;
    let mut stock = self.shared.tables.read().stocks.get(&id).cloned();
    if let (Some(stock), Some(staged)) = (stock.as_mut(), self.inventory_writes.get(&id)) {
      stock.inventory = *staged;
    }
    Ok(stock)
  }

  async fn write_inventory(&mut self, id: StockId, inventory: i64) -> ShopResult<()> {
    if !self.holds(RowKey::Stock(id)) {
      return Err(ShopError::persistence(
        "write inventory",
        anyhow!("stock {} is not locked by this transaction", id),
      ));
    }
    if inventory < 0 {
      return Err(ShopError::persistence(
        "write inventory",
        anyhow!("check constraint violated: inventory of stock {} would be {}", id, inventory),
      ));
    }
    self.inventory_writes.insert(id, inventory);
    Ok(())
  }

  async fn lock_cart_line(&mut self, user: UserId, stock: StockId) -> ShopResult<Option<CartLine>> {
    self.acquire(RowKey::CartSlot(user, stock)).await?;
    Ok(
      self
        .visible_cart_lines(user)
        .into_iter()
        .find(|line| line.stock_id == stock),
    )
  }

  async fn lock_cart_line_by_id(&mut self, user: UserId, line: CartLineId) -> ShopResult<Option<CartLine>> {
    let Some(found) = self.visible_cart_lines(user).into_iter().find(|l| l.id == line) else {
      return Ok(None);
    };
    self.acquire(RowKey::CartSlot(user, found.stock_id)).await?;
    // The line may have been removed while we waited.
    Ok(self.visible_cart_lines(user).into_iter().find(|l| l.id == line))
  }

  async fn lock_cart(&mut self, user: UserId) -> ShopResult<Vec<CartLine>> {
    let slots: BTreeSet<StockId> = self
      .visible_cart_lines(user)
      .iter()
      .map(|line| line.stock_id)
      .collect();
    for stock in slots {
      self.acquire(RowKey::CartSlot(user, stock)).await?;
    }
    let mut lines: Vec<CartLine> = self
      .visible_cart_lines(user)
      .into_iter()
      .filter(|line| self.holds(RowKey::CartSlot(user, line.stock_id)))
      .collect();
    lines.sort_by_key(|line| line.stock_id);
    Ok(lines)
  }

  async fn insert_cart_line(&mut self, user: UserId, stock: StockId, quantity: i64) -> ShopResult<CartLine> {
    if quantity <= 0 {
      return Err(ShopError::persistence(
        "insert cart line",
        anyhow!("check constraint violated: quantity {} must be positive", quantity),
      ));
    }
    if self.visible_cart_lines(user).iter().any(|l| l.stock_id == stock) {
      return Err(ShopError::persistence(
        "insert cart line",
        anyhow!("unique violation on cart line (user {}, stock {})", user, stock),
      ));
    }
    let line = CartLine {
      id: CartLineId(next(&self.shared.seq.cart_line)),
      user_id: user,
      stock_id: stock,
      quantity,
      added_at: Utc::now(),
    };
    self.cart_upserts.insert(line.id, line.clone());
    Ok(line)
  }

  async fn write_cart_quantity(&mut self, line: CartLineId, quantity: i64) -> ShopResult<()> {
    if quantity <= 0 {
      return Err(ShopError::persistence(
        "write cart quantity",
        anyhow!("check constraint violated: quantity {} must be positive", quantity),
      ));
    }
    let current = match self.cart_upserts.get(&line) {
      Some(staged) => Some(staged.clone()),
      None if self.cart_deletes.contains(&line) => None,
      None => self.shared.tables.read().cart_lines.get(&line).cloned(),
    };
    let mut current = current.ok_or_else(|| ShopError::not_found(Entity::CartLine(line)))?;
    current.quantity = quantity;
    self.cart_upserts.insert(line, current);
    Ok(())
  }

  async fn delete_cart_lines(&mut self, user: UserId, lines: &[CartLineId]) -> ShopResult<u64> {
    let visible: BTreeSet<CartLineId> = self.visible_cart_lines(user).iter().map(|l| l.id).collect();
    let mut deleted = 0;
    for id in lines {
      if visible.contains(id) && self.cart_deletes.insert(*id) {
        self.cart_upserts.remove(id);
        deleted += 1;
      }
    }
    Ok(deleted)
  }

  async fn insert_order(&mut self, user: UserId) -> ShopResult<Order> {
    let now = Utc::now();
    let order = Order {
      id: OrderId(next(&self.shared.seq.order)),
      user_id: user,
      status: OrderStatus::Pending,
      total_price: 0,
      created_at: now,
      updated_at: now,
    };
    self.orders.insert(order.id, order.clone());
    Ok(order)
  }

  async fn insert_order_item(&mut self, item: NewOrderItem) -> ShopResult<OrderItem> {
    let order_known = self.orders.contains_key(&item.order_id) || self.committed_order(item.order_id).is_some();
    if !order_known {
      return Err(ShopError::persistence(
        "insert order item",
        anyhow!("foreign key violated: order {} does not exist", item.order_id),
      ));
    }
    if item.qty <= 0 {
      return Err(ShopError::persistence(
        "insert order item",
        anyhow!("check constraint violated: qty {} must be positive", item.qty),
      ));
    }
    let stored = OrderItem {
      id: OrderItemId(next(&self.shared.seq.order_item)),
      order_id: item.order_id,
      stock_id: item.stock_id,
      name: item.name,
      price: item.price,
      qty: item.qty,
    };
    self.new_items.push(stored.clone());
    Ok(stored)
  }

  async fn write_order_total(&mut self, order: OrderId, total: i64) -> ShopResult<Order> {
    let row = self.order_mut(order, "write order total")?;
    row.total_price = total;
    row.updated_at = Utc::now();
    Ok(row.clone())
  }

  async fn lock_order(&mut self, user: UserId, id: OrderId) -> ShopResult<Option<Order>> {
    // Check ownership before locking so another user's order is never held.
    let owned = self
      .orders
      .get(&id)
      .cloned()
      .or_else(|| self.committed_order(id))
      .is_some_and(|order| order.user_id == user);
    if !owned {
      return Ok(None);
    }
    self.acquire(RowKey::Order(id)).await?;
    if let Some(order) = self.orders.get(&id) {
      return Ok(Some(order.clone()));
    }
    let order = self.committed_order(id);
    if let Some(order) = &order {
      self.orders.insert(id, order.clone());
    }
    Ok(order)
  }

  async fn write_order_status(&mut self, order: OrderId, status: OrderStatus) -> ShopResult<Order> {
    let row = self.order_mut(order, "write order status")?;
    row.status = status;
    row.updated_at = Utc::now();
    Ok(row.clone())
  }

  async fn order_items(&mut self, order: OrderId) -> ShopResult<Vec<OrderItem>> {
    let mut items: Vec<OrderItem> = {
      let tables = self.shared.tables.read();
      tables
        .order_items
        .values()
        .filter(|item| item.order_id == order)
        .cloned()
        .collect()
    };
    items.extend(self.new_items.iter().filter(|item| item.order_id == order).cloned());
    items.sort_by_key(|item| item.id);
    Ok(items)
  }

  async fn commit(mut self) -> ShopResult<()> {
    let inventory_writes = std::mem::take(&mut self.inventory_writes);
    let orders = std::mem::take(&mut self.orders);
    let cart_upserts = std::mem::take(&mut self.cart_upserts);
    let cart_deletes = std::mem::take(&mut self.cart_deletes);
    let new_items = std::mem::take(&mut self.new_items);

    {
      let mut tables = self.shared.tables.write();

      for line in cart_upserts.values() {
        let clash = tables.cart_lines.values().any(|other| {
          other.id != line.id
            && !cart_deletes.contains(&other.id)
            && other.user_id == line.user_id
            && other.stock_id == line.stock_id
        });
        if clash {
          return Err(ShopError::persistence(
            "commit",
            anyhow!(
              "unique violation on cart line (user {}, stock {})",
              line.user_id,
              line.stock_id
            ),
          ));
        }
      }

      let now = Utc::now();
      for (id, inventory) in inventory_writes {
        if let Some(row) = tables.stocks.get_mut(&id) {
          row.inventory = inventory;
          row.updated_at = now;
        }
      }
      tables.orders.extend(orders);
      for id in &cart_deletes {
        tables.cart_lines.remove(id);
      }
      tables.cart_lines.extend(cart_upserts);
      tables
        .order_items
        .extend(new_items.into_iter().map(|item| (item.id, item)));
    }

    self.finished = true;
    debug!(locks = self.held.len(), "memory transaction committed");
    Ok(())
  }

  async fn rollback(mut self) -> ShopResult<()> {
    self.finished = true;
    debug!(locks = self.held.len(), "memory transaction rolled back");
    Ok(())
  }
}

impl Drop for MemoryTx {
  fn drop(&mut self) {
    if !self.finished {
      debug!(locks = self.held.len(), "memory transaction dropped without commit; rolled back");
    }
    let released: Vec<RowKey> = self
      .held
      .drain()
      .map(|(key, guard)| {
        drop(guard);
        key
      })
      .collect();
    self.shared.forget_idle(released);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lamp() -> NewStock {
    NewStock {
      name: "Lamp".to_string(),
      price: 150,
      inventory: 4,
      category: "Home".to_string(),
      info: String::new(),
    }
  }

  fn tracked_locks(gateway: &MemoryGateway) -> usize {
    gateway.shared.row_locks.lock().len()
  }

  #[tokio::test]
  async fn finished_transactions_release_their_lock_entries() {
    let gateway = MemoryGateway::new();
    let stock = gateway.insert_stock(lamp()).await.unwrap();

    for n in 0..500 {
      let mut tx = gateway.begin().await.unwrap();
      tx.lock_cart_line(UserId(n), stock.id).await.unwrap();
      match n % 3 {
        0 => tx.rollback().await.unwrap(),
        1 => tx.commit().await.unwrap(),
        _ => drop(tx),
      }
    }
    assert_eq!(tracked_locks(&gateway), 0);
  }

  #[tokio::test]
  async fn lock_entry_survives_while_another_transaction_waits() {
    let gateway = MemoryGateway::with_lock_timeout(Duration::from_secs(2));
    let stock = gateway.insert_stock(lamp()).await.unwrap();

    let mut holder = gateway.begin().await.unwrap();
    holder.lock_stock(stock.id).await.unwrap();

    let contender = gateway.clone();
    let waiter = tokio::spawn(async move {
      let mut tx = contender.begin().await.unwrap();
      tx.lock_stock(stock.id).await.unwrap();
      tx.rollback().await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    holder.rollback().await.unwrap();
    assert_eq!(tracked_locks(&gateway), 1);

    waiter.await.unwrap();
    assert_eq!(tracked_locks(&gateway), 0);
  }

  #[tokio::test]
  async fn deleting_a_stock_drops_its_cart_lines_only() {
    let gateway = MemoryGateway::new();
    let kept = gateway.insert_stock(lamp()).await.unwrap();
    let gone = gateway
      .insert_stock(NewStock {
        name: "Desk".to_string(),
        ..lamp()
      })
      .await
      .unwrap();

    let mut tx = gateway.begin().await.unwrap();
    tx.insert_cart_line(UserId(1), kept.id, 1).await.unwrap();
    tx.insert_cart_line(UserId(1), gone.id, 1).await.unwrap();
    tx.commit().await.unwrap();

    gateway.delete_stock(gone.id).unwrap();
    assert!(gateway.stock(gone.id).await.unwrap().is_none());
    let entries = gateway.cart_entries(UserId(1)).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].stock.id, kept.id);
    assert!(matches!(
      gateway.delete_stock(gone.id),
      Err(ShopError::NotFound { .. })
    ));
  }

  #[tokio::test]
  async fn dropped_transaction_leaves_no_trace() {
    let gateway = MemoryGateway::new();
    let stock = gateway.insert_stock(lamp()).await.unwrap();

    {
      let mut tx = gateway.begin().await.unwrap();
      tx.lock_stock(stock.id).await.unwrap();
      tx.write_inventory(stock.id, 1).await.unwrap();
      tx.insert_cart_line(UserId(1), stock.id, 2).await.unwrap();
      let order = tx.insert_order(UserId(1)).await.unwrap();
      tx.insert_order_item(NewOrderItem::snapshot(order.id, &stock, 3))
        .await
        .unwrap();
    }

    assert_eq!(gateway.stock(stock.id).await.unwrap().unwrap().inventory, 4);
    assert!(gateway.cart_entries(UserId(1)).await.unwrap().is_empty());
    assert_eq!(gateway.count_orders(UserId(1)).await.unwrap(), 0);

    // The row lock went away with the transaction.
    let mut tx = gateway.begin().await.unwrap();
    assert!(tx.lock_stock(stock.id).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn staged_writes_are_invisible_until_commit() {
    let gateway = MemoryGateway::new();
    let stock = gateway.insert_stock(lamp()).await.unwrap();

    let mut tx = gateway.begin().await.unwrap();
    tx.lock_stock(stock.id).await.unwrap();
    tx.write_inventory(stock.id, 0).await.unwrap();
    assert_eq!(tx.lock_stock(stock.id).await.unwrap().unwrap().inventory, 0);
    assert_eq!(gateway.stock(stock.id).await.unwrap().unwrap().inventory, 4);

    tx.commit().await.unwrap();
    assert_eq!(gateway.stock(stock.id).await.unwrap().unwrap().inventory, 0);
  }

  #[tokio::test]
  async fn lock_wait_times_out_as_retryable_failure() {
    let gateway = MemoryGateway::with_lock_timeout(Duration::from_millis(30));
    let stock = gateway.insert_stock(lamp()).await.unwrap();

    let mut holder = gateway.begin().await.unwrap();
    holder.lock_stock(stock.id).await.unwrap();

    let mut waiter = gateway.begin().await.unwrap();
    let err = waiter.lock_stock(stock.id).await.unwrap_err();
    assert!(err.is_retryable());

    holder.rollback().await.unwrap();
    assert!(waiter.lock_stock(stock.id).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn writing_inventory_requires_the_row_lock() {
    let gateway = MemoryGateway::new();
    let stock = gateway.insert_stock(lamp()).await.unwrap();

    let mut tx = gateway.begin().await.unwrap();
    assert!(tx.write_inventory(stock.id, 3).await.is_err());
    tx.lock_stock(stock.id).await.unwrap();
    assert!(tx.write_inventory(stock.id, -1).await.is_err());
  }

  #[tokio::test]
  async fn cart_slot_is_unique_per_user_and_stock() {
    let gateway = MemoryGateway::new();
    let stock = gateway.insert_stock(lamp()).await.unwrap();

    let mut tx = gateway.begin().await.unwrap();
    tx.lock_cart_line(UserId(1), stock.id).await.unwrap();
    tx.insert_cart_line(UserId(1), stock.id, 1).await.unwrap();
    assert!(tx.insert_cart_line(UserId(1), stock.id, 1).await.is_err());
    tx.insert_cart_line(UserId(2), stock.id, 1).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(gateway.cart_entries(UserId(1)).await.unwrap().len(), 1);
    assert_eq!(gateway.cart_entries(UserId(2)).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn foreign_orders_are_not_locked() {
    let gateway = MemoryGateway::new();
    let mut tx = gateway.begin().await.unwrap();
    let order = tx.insert_order(UserId(1)).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = gateway.begin().await.unwrap();
    assert!(tx.lock_order(UserId(2), order.id).await.unwrap().is_none());
    assert!(tx.lock_order(UserId(1), order.id).await.unwrap().is_some());
  }
}
