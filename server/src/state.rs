// storefront_server/src/state.rs
use std::sync::Arc;
use storefront::{CartAggregator, Gateway, OrderEngine, StockLedger};

/// Shared by every actix worker. All three components point at the same gateway.
pub struct AppState<G: Gateway> {
  pub ledger: StockLedger<G>,
  pub cart: CartAggregator<G>,
  pub orders: OrderEngine<G>,
}

impl<G: Gateway> AppState<G> {
  pub fn new(gateway: Arc<G>) -> Self {
    AppState {
      ledger: StockLedger::new(Arc::clone(&gateway)),
      cart: CartAggregator::new(Arc::clone(&gateway)),
      orders: OrderEngine::new(gateway),
    }
  }
}

impl<G: Gateway> Clone for AppState<G> {
  fn clone(&self) -> Self {
    AppState {
      ledger: self.ledger.clone(),
      cart: self.cart.clone(),
      orders: self.orders.clone(),
    }
  }
}
