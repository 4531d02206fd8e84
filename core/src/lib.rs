// src/lib.rs

//! Storefront: an order and inventory consistency engine.
//!
//! The crate turns shopping carts into orders without overselling stock,
//! and drives orders through a small state machine:
//!  - [`StockLedger`] owns inventory counts and the only code that writes them.
//!  - [`CartAggregator`] keeps per-user carts, merging repeated additions.
//!  - [`OrderEngine`] checks carts out atomically and handles pay/cancel,
//!    restoring inventory on cancellation exactly once.
//!
//! All of them run against a [`Gateway`], which supplies transactions with
//! exclusive row locks. [`MemoryGateway`] is the in-process implementation.

pub mod cart;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod model;
pub mod orders;

pub use crate::cart::CartAggregator;
pub use crate::error::{Entity, ErrorKind, ShopError, ShopResult};
pub use crate::gateway::{Gateway, MemoryGateway, Transaction};
pub use crate::ledger::{LockedStock, StockLedger};
pub use crate::orders::OrderEngine;

/*
    Checkout in brief:
    1. Begin one transaction.
    2. Lock the user's cart lines, ascending stock id. Empty cart fails.
    3. Insert a pending order to get its id.
    4. For each line: lock the stock row, decrement, snapshot an order item.
    5. Write the total, delete exactly the locked cart lines, commit.
    Any error before the commit drops the transaction, which rolls it back.
*/
