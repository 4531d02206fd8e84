// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use storefront::model::{NewStock, Stock, StockId, UserId};
use storefront::{CartAggregator, Gateway, MemoryGateway, OrderEngine, StockLedger};
use tracing::Level;

pub const ALICE: UserId = UserId(1);
pub const BOB: UserId = UserId(2);

// --- Helper for Tracing Setup ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// All three components over one shared in-memory gateway.
#[derive(Clone)]
pub struct Shop {
  pub gateway: Arc<MemoryGateway>,
  pub ledger: StockLedger<MemoryGateway>,
  pub cart: CartAggregator<MemoryGateway>,
  pub orders: OrderEngine<MemoryGateway>,
}

impl Shop {
  pub fn new() -> Self {
    Self::with_gateway(MemoryGateway::new())
  }

  pub fn with_lock_timeout(timeout: Duration) -> Self {
    Self::with_gateway(MemoryGateway::with_lock_timeout(timeout))
  }

  fn with_gateway(gateway: MemoryGateway) -> Self {
    setup_tracing();
    let gateway = Arc::new(gateway);
    Shop {
      ledger: StockLedger::new(Arc::clone(&gateway)),
      cart: CartAggregator::new(Arc::clone(&gateway)),
      orders: OrderEngine::new(Arc::clone(&gateway)),
      gateway,
    }
  }

  pub async fn stock(&self, name: &str, price: i64, inventory: i64) -> Stock {
    self
      .gateway
      .insert_stock(NewStock {
        name: name.to_string(),
        price,
        inventory,
        category: "Test".to_string(),
        info: format!("{} for tests", name),
      })
      .await
      .expect("insert stock")
  }

  pub async fn inventory(&self, id: StockId) -> i64 {
    self.ledger.get(id).await.expect("stock exists").inventory
  }

  pub fn set_inventory(&self, id: StockId, inventory: i64) {
    self
      .gateway
      .edit_stock(id, |stock| stock.inventory = inventory)
      .expect("edit stock");
  }

  /// `(stock_id, quantity)` pairs, ascending stock id.
  pub async fn cart_contents(&self, user: UserId) -> Vec<(StockId, i64)> {
    let mut contents: Vec<(StockId, i64)> = self
      .cart
      .list_items(user)
      .await
      .expect("list cart")
      .into_iter()
      .map(|entry| (entry.line.stock_id, entry.line.quantity))
      .collect();
    contents.sort();
    contents
  }

  pub async fn order_count(&self, user: UserId) -> i64 {
    self.gateway.count_orders(user).await.expect("count orders")
  }
}
