// storefront/src/cart.rs

//! Cart Aggregator: per-user pending selections.
//!
//! Inventory checks here are advisory. They read committed stock without
//! locking it; checkout re-validates every line under the stock row lock.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{Entity, ShopError, ShopResult};
use crate::gateway::{Gateway, Transaction};
use crate::ledger::StockLedger;
use crate::model::{CartEntry, CartLine, CartLineId, Stock, StockId, UserId};

pub struct CartAggregator<G: Gateway> {
  gateway: Arc<G>,
  ledger: StockLedger<G>,
}

impl<G: Gateway> Clone for CartAggregator<G> {
  fn clone(&self) -> Self {
    CartAggregator {
      gateway: Arc::clone(&self.gateway),
      ledger: self.ledger.clone(),
    }
  }
}

fn ensure_available(stock: &Stock, requested: i64) -> ShopResult<()> {
  if requested > stock.inventory {
    warn!(stock_id = %stock.id, requested, available = stock.inventory, "cart quantity exceeds inventory");
    return Err(ShopError::InsufficientInventory {
      stock_id: stock.id,
      name: stock.name.clone(),
      requested,
      available: stock.inventory,
    });
  }
  Ok(())
}

impl<G: Gateway> CartAggregator<G> {
  pub fn new(gateway: Arc<G>) -> Self {
    let ledger = StockLedger::new(Arc::clone(&gateway));
    CartAggregator { gateway, ledger }
  }

  /// Adds `quantity` of a stock, merging into an existing line for the same
  /// stock. A non-positive quantity counts as 1.
  #[instrument(name = "CartAggregator::add_item", skip(self), fields(user_id = %user), err(Display))]
  pub async fn add_item(&self, user: UserId, stock_id: StockId, quantity: i64) -> ShopResult<CartLine> {
    let quantity = if quantity <= 0 { 1 } else { quantity };
    let stock = self.ledger.get(stock_id).await?;

    let mut tx = self.gateway.begin().await?;
    let line = match tx.lock_cart_line(user, stock_id).await? {
      None => {
        ensure_available(&stock, quantity)?;
        tx.insert_cart_line(user, stock_id, quantity).await?
      }
      Some(mut existing) => {
        let merged = existing
          .quantity
          .checked_add(quantity)
          .ok_or_else(|| ShopError::InvalidArgument(format!("quantity {} is too large", quantity)))?;
        ensure_available(&stock, merged)?;
        tx.write_cart_quantity(existing.id, merged).await?;
        existing.quantity = merged;
        existing
      }
    };
    tx.commit().await?;

    info!(cart_line_id = %line.id, stock_id = %stock_id, quantity = line.quantity, "cart line saved");
    Ok(line)
  }

  /// Lines joined with current stock data, most recently added first.
  pub async fn list_items(&self, user: UserId) -> ShopResult<Vec<CartEntry>> {
    self.gateway.cart_entries(user).await
  }

  #[instrument(name = "CartAggregator::update_quantity", skip(self), fields(user_id = %user), err(Display))]
  pub async fn update_quantity(&self, user: UserId, line_id: CartLineId, quantity: i64) -> ShopResult<CartLine> {
    if quantity <= 0 {
      return Err(ShopError::InvalidArgument(format!(
        "quantity must be positive, got {}",
        quantity
      )));
    }

    let mut tx = self.gateway.begin().await?;
    let mut line = tx
      .lock_cart_line_by_id(user, line_id)
      .await?
      .ok_or_else(|| ShopError::not_found(Entity::CartLine(line_id)))?;
    let stock = self.ledger.get(line.stock_id).await?;
    ensure_available(&stock, quantity)?;
    tx.write_cart_quantity(line.id, quantity).await?;
    tx.commit().await?;

    line.quantity = quantity;
    info!(cart_line_id = %line.id, quantity, "cart line quantity updated");
    Ok(line)
  }

  /// Removing a line that is missing or owned by someone else still succeeds.
  #[instrument(name = "CartAggregator::remove_item", skip(self), fields(user_id = %user), err(Display))]
  pub async fn remove_item(&self, user: UserId, line_id: CartLineId) -> ShopResult<()> {
    let removed = self.gateway.delete_cart_line(user, line_id).await?;
    info!(cart_line_id = %line_id, removed, "cart line removal processed");
    Ok(())
  }

  /// Locks every line of the user's cart inside `tx`, ascending stock id.
  pub async fn lock_for_checkout(&self, tx: &mut G::Tx, user: UserId) -> ShopResult<Vec<CartLine>> {
    let lines = tx.lock_cart(user).await?;
    if lines.is_empty() {
      warn!(user_id = %user, "checkout attempted with an empty cart");
      return Err(ShopError::EmptyCart);
    }
    Ok(lines)
  }

  /// Deletes exactly the given lines; lines added after the checkout snapshot
  /// are left alone.
  pub async fn clear_checked_out(&self, tx: &mut G::Tx, user: UserId, lines: &[CartLine]) -> ShopResult<()> {
    let ids: Vec<CartLineId> = lines.iter().map(|line| line.id).collect();
    let deleted = tx.delete_cart_lines(user, &ids).await?;
    if deleted != ids.len() as u64 {
      return Err(ShopError::persistence(
        "clear checked-out cart lines",
        anyhow::anyhow!("expected to delete {} lines, deleted {}", ids.len(), deleted),
      ));
    }
    Ok(())
  }
}
