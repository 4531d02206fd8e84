// storefront/src/ledger.rs

//! Stock Ledger: the only code that writes inventory counts.
//!
//! Inventory changes go through [`StockLedger::adjust_inventory`], which takes
//! the [`LockedStock`] handed out by [`StockLedger::lock_and_get`]. Holding one
//! means the row lock is held by the transaction it came from.

use std::ops::Deref;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::{Entity, ShopError, ShopResult};
use crate::gateway::{Gateway, Transaction};
use crate::model::{Stock, StockId};

/// A stock row read under its exclusive lock. Tracks inventory writes made
/// through the ledger in the same transaction.
#[derive(Debug)]
pub struct LockedStock {
  stock: Stock,
}

impl LockedStock {
  pub fn into_inner(self) -> Stock {
    self.stock
  }
}

impl Deref for LockedStock {
  type Target = Stock;

  fn deref(&self) -> &Stock {
    &self.stock
  }
}

pub struct StockLedger<G: Gateway> {
  gateway: Arc<G>,
}

impl<G: Gateway> Clone for StockLedger<G> {
  fn clone(&self) -> Self {
    StockLedger {
      gateway: Arc::clone(&self.gateway),
    }
  }
}

impl<G: Gateway> StockLedger<G> {
  pub fn new(gateway: Arc<G>) -> Self {
    StockLedger { gateway }
  }

  /// Non-locking read of committed state. Good for display and soft checks
  /// only; the value may be stale by the time it is used.
  pub async fn get(&self, id: StockId) -> ShopResult<Stock> {
    self
      .gateway
      .stock(id)
      .await?
      .ok_or_else(|| ShopError::not_found(Entity::Stock(id)))
  }

  /// The whole catalog, newest first.
  pub async fn list(&self) -> ShopResult<Vec<Stock>> {
    self.gateway.stocks().await
  }

  /// Takes the row lock for `id` inside `tx`, waiting for any other holder.
  pub async fn lock_and_get(&self, tx: &mut G::Tx, id: StockId) -> ShopResult<LockedStock> {
    let stock = tx
      .lock_stock(id)
      .await?
      .ok_or_else(|| ShopError::not_found(Entity::Stock(id)))?;
    debug!(stock_id = %id, inventory = stock.inventory, "stock row locked");
    Ok(LockedStock { stock })
  }

  /// Applies a signed delta and returns the new inventory. Fails with
  /// `InsufficientInventory` rather than let the count go negative.
  #[instrument(name = "StockLedger::adjust_inventory", skip(self, tx, locked), fields(stock_id = %locked.id), err(Display))]
  pub async fn adjust_inventory(&self, tx: &mut G::Tx, locked: &mut LockedStock, delta: i64) -> ShopResult<i64> {
    let available = locked.stock.inventory;
    let next = available.checked_add(delta).ok_or_else(|| {
      ShopError::InvalidArgument(format!("inventory adjustment of {} on stock {} overflows", delta, locked.id))
    })?;
    if next < 0 {
      warn!(requested = -delta, available, "inventory would go negative");
      return Err(ShopError::InsufficientInventory {
        stock_id: locked.stock.id,
        name: locked.stock.name.clone(),
        requested: delta.saturating_neg(),
        available,
      });
    }
    tx.write_inventory(locked.stock.id, next).await?;
    locked.stock.inventory = next;
    debug!(from = available, to = next, "inventory adjusted");
    Ok(next)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gateway::MemoryGateway;
  use crate::model::NewStock;

  async fn ledger_with_stock(inventory: i64) -> (StockLedger<MemoryGateway>, Arc<MemoryGateway>, StockId) {
    let gateway = Arc::new(MemoryGateway::new());
    let stock = gateway
      .insert_stock(NewStock {
        name: "Kettle".to_string(),
        price: 40,
        inventory,
        category: "Kitchen".to_string(),
        info: String::new(),
      })
      .await
      .unwrap();
    (StockLedger::new(Arc::clone(&gateway)), gateway, stock.id)
  }

  #[tokio::test]
  async fn get_reports_missing_stock() {
    let (ledger, _, _) = ledger_with_stock(1).await;
    let err = ledger.get(StockId(99)).await.unwrap_err();
    assert!(matches!(
      err,
      ShopError::NotFound {
        entity: Entity::Stock(StockId(99))
      }
    ));
  }

  #[tokio::test]
  async fn adjustment_is_bounded_at_zero() {
    let (ledger, gateway, id) = ledger_with_stock(3).await;
    let mut tx = gateway.begin().await.unwrap();
    let mut locked = ledger.lock_and_get(&mut tx, id).await.unwrap();

    assert_eq!(ledger.adjust_inventory(&mut tx, &mut locked, -3).await.unwrap(), 0);
    let err = ledger.adjust_inventory(&mut tx, &mut locked, -1).await.unwrap_err();
    match err {
      ShopError::InsufficientInventory {
        requested, available, ..
      } => assert_eq!((requested, available), (1, 0)),
      other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ledger.adjust_inventory(&mut tx, &mut locked, 2).await.unwrap(), 2);
    tx.commit().await.unwrap();

    assert_eq!(ledger.get(id).await.unwrap().inventory, 2);
  }
}
