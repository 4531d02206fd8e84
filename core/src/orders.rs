// storefront/src/orders.rs

//! Order Engine: checkout, the order state machine, and order reads.
//!
//! Lock order, shared with the rest of the crate: cart slots (ascending stock
//! id), then the order row, then stock rows (ascending stock id). Nothing
//! takes a cart or order lock while holding a stock lock.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::cart::CartAggregator;
use crate::error::{Entity, ShopError, ShopResult};
use crate::gateway::{Gateway, Transaction};
use crate::ledger::StockLedger;
use crate::model::{
  NewOrderItem, Order, OrderAction, OrderDetail, OrderId, OrderPage, PageRequest, Transition, UserId,
};

pub struct OrderEngine<G: Gateway> {
  gateway: Arc<G>,
  ledger: StockLedger<G>,
  cart: CartAggregator<G>,
}

impl<G: Gateway> Clone for OrderEngine<G> {
  fn clone(&self) -> Self {
    OrderEngine {
      gateway: Arc::clone(&self.gateway),
      ledger: self.ledger.clone(),
      cart: self.cart.clone(),
    }
  }
}

impl<G: Gateway> OrderEngine<G> {
  pub fn new(gateway: Arc<G>) -> Self {
    OrderEngine {
      ledger: StockLedger::new(Arc::clone(&gateway)),
      cart: CartAggregator::new(Arc::clone(&gateway)),
      gateway,
    }
  }

  /// Converts the user's whole cart into a `pending` order in one
  /// transaction. Either every line is decremented, snapshotted and removed
  /// from the cart, or nothing is.
  #[instrument(name = "OrderEngine::create_order", skip(self), fields(user_id = %user), err(Display))]
  pub async fn create_order(&self, user: UserId) -> ShopResult<OrderDetail> {
    let mut tx = self.gateway.begin().await?;

    let lines = self.cart.lock_for_checkout(&mut tx, user).await?;
    let order = tx.insert_order(user).await?;

    let mut items = Vec::with_capacity(lines.len());
    let mut total: i64 = 0;
    // `lines` is in ascending stock id order.
    for line in &lines {
      let mut stock = self.ledger.lock_and_get(&mut tx, line.stock_id).await?;
      self.ledger.adjust_inventory(&mut tx, &mut stock, -line.quantity).await?;

      let item = tx
        .insert_order_item(NewOrderItem::snapshot(order.id, &stock, line.quantity))
        .await?;
      total = item
        .line_total()
        .and_then(|line_total| total.checked_add(line_total))
        .ok_or_else(|| ShopError::InvalidArgument("order total overflows".to_string()))?;
      items.push(item);
    }

    let order = tx.write_order_total(order.id, total).await?;
    self.cart.clear_checked_out(&mut tx, user, &lines).await?;
    tx.commit().await?;

    info!(order_id = %order.id, total, items = items.len(), "order created");
    Ok(OrderDetail { order, items })
  }

  /// `pending → paid`. Paying a paid order succeeds without effect.
  #[instrument(name = "OrderEngine::pay_order", skip(self), fields(user_id = %user), err(Display))]
  pub async fn pay_order(&self, user: UserId, order_id: OrderId) -> ShopResult<Order> {
    let mut tx = self.gateway.begin().await?;
    let (order, transition) = self.lock_for(&mut tx, user, order_id, OrderAction::Pay).await?;

    let Transition::MoveTo(status) = transition else {
      tx.rollback().await?;
      info!(order_id = %order_id, "order already paid");
      return Ok(order);
    };

    let order = tx.write_order_status(order_id, status).await?;
    tx.commit().await?;
    info!(order_id = %order_id, "order paid");
    Ok(order)
  }

  /// `pending → canceled`, returning every item's quantity to its stock.
  /// Canceling a canceled order succeeds without effect. The order row lock
  /// serializes concurrent cancels, so inventory comes back at most once.
  #[instrument(name = "OrderEngine::cancel_order", skip(self), fields(user_id = %user), err(Display))]
  pub async fn cancel_order(&self, user: UserId, order_id: OrderId) -> ShopResult<Order> {
    let mut tx = self.gateway.begin().await?;
    let (order, transition) = self.lock_for(&mut tx, user, order_id, OrderAction::Cancel).await?;

    let Transition::MoveTo(status) = transition else {
      tx.rollback().await?;
      info!(order_id = %order_id, "order already canceled");
      return Ok(order);
    };

    let mut items = tx.order_items(order_id).await?;
    items.sort_by_key(|item| item.stock_id);
    for item in &items {
      // A vanished stock row fails the whole cancel; the order stays pending.
      let mut stock = self.ledger.lock_and_get(&mut tx, item.stock_id).await?;
      self.ledger.adjust_inventory(&mut tx, &mut stock, item.qty).await?;
    }

    let order = tx.write_order_status(order_id, status).await?;
    tx.commit().await?;
    info!(order_id = %order_id, items = items.len(), "order canceled; inventory restored");
    Ok(order)
  }

  /// The user's orders, newest first.
  pub async fn list_orders(&self, user: UserId, page: PageRequest) -> ShopResult<OrderPage> {
    let total = self.gateway.count_orders(user).await?;
    let list = self
      .gateway
      .orders_page(user, page.offset(), page.page_size())
      .await?;
    Ok(OrderPage {
      total,
      page: page.page(),
      page_size: page.page_size(),
      list,
    })
  }

  /// Missing and not-owned orders are both `NotFound`.
  pub async fn get_order(&self, user: UserId, order_id: OrderId) -> ShopResult<OrderDetail> {
    let order = self
      .gateway
      .order(user, order_id)
      .await?
      .ok_or_else(|| ShopError::not_found(Entity::Order(order_id)))?;
    let items = self.gateway.order_items(order.id).await?;
    Ok(OrderDetail { order, items })
  }

  async fn lock_for(
    &self,
    tx: &mut G::Tx,
    user: UserId,
    order_id: OrderId,
    action: OrderAction,
  ) -> ShopResult<(Order, Transition)> {
    let order = tx
      .lock_order(user, order_id)
      .await?
      .ok_or_else(|| ShopError::not_found(Entity::Order(order_id)))?;
    match order.status.transition(action) {
      Some(transition) => Ok((order, transition)),
      None => {
        warn!(order_id = %order_id, status = %order.status, action = %action, "order transition rejected");
        Err(ShopError::InvalidTransition {
          order_id,
          from: order.status,
          action,
        })
      }
    }
  }
}
