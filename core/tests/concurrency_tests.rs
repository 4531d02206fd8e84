// tests/concurrency_tests.rs
mod common;
use common::*;
use futures_util::future::join_all;
use std::time::Duration;
use storefront::model::UserId;
use storefront::{ErrorKind, Gateway, ShopError, Transaction};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() {
  let shop = Shop::new();
  let lamp = shop.stock("Lamp", 150, 5).await;
  let buyers: Vec<UserId> = (100..120).map(UserId).collect();
  for &buyer in &buyers {
    shop.cart.add_item(buyer, lamp.id, 1).await.unwrap();
  }

  let tasks = buyers.iter().map(|&buyer| {
    let shop = shop.clone();
    tokio::spawn(async move { shop.orders.create_order(buyer).await })
  });
  let results: Vec<_> = join_all(tasks).await.into_iter().map(|joined| joined.unwrap()).collect();

  let succeeded = results.iter().filter(|result| result.is_ok()).count();
  let sold_out = results
    .iter()
    .filter(|result| matches!(result, Err(ShopError::InsufficientInventory { .. })))
    .count();
  assert_eq!(succeeded, 5);
  assert_eq!(sold_out, 15);
  assert_eq!(shop.inventory(lamp.id).await, 0);

  let mut ordered = 0;
  for &buyer in &buyers {
    ordered += shop.order_count(buyer).await;
  }
  assert_eq!(ordered, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_carts_check_out_without_deadlock() {
  let shop = Shop::new();
  let a = shop.stock("A", 1, 1_000).await;
  let b = shop.stock("B", 2, 1_000).await;
  let c = shop.stock("C", 3, 1_000).await;

  // Carts built in different orders; checkout must still lock in one order.
  let layouts = [vec![a.id, b.id, c.id], vec![c.id, b.id, a.id], vec![b.id, c.id], vec![c.id, a.id]];
  let mut buyers = Vec::new();
  for round in 0..4i64 {
    for (i, layout) in layouts.iter().enumerate() {
      let buyer = UserId(1_000 + round * 10 + i as i64);
      for &stock in layout {
        shop.cart.add_item(buyer, stock, 1).await.unwrap();
      }
      buyers.push(buyer);
    }
  }

  let tasks = buyers.iter().map(|&buyer| {
    let shop = shop.clone();
    tokio::spawn(async move { shop.orders.create_order(buyer).await })
  });
  let results = tokio::time::timeout(Duration::from_secs(10), join_all(tasks))
    .await
    .expect("checkouts deadlocked");

  for joined in results {
    joined.unwrap().unwrap();
  }
  // 4 rounds, A in 3 layouts, B in 3, C in 4.
  assert_eq!(shop.inventory(a.id).await, 1_000 - 12);
  assert_eq!(shop.inventory(b.id).await, 1_000 - 12);
  assert_eq!(shop.inventory(c.id).await, 1_000 - 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_cancels_restore_inventory_once() {
  let shop = Shop::new();
  let lamp = shop.stock("Lamp", 150, 6).await;
  shop.cart.add_item(ALICE, lamp.id, 4).await.unwrap();
  let order = shop.orders.create_order(ALICE).await.unwrap().order;
  assert_eq!(shop.inventory(lamp.id).await, 2);

  let tasks = (0..8).map(|_| {
    let shop = shop.clone();
    tokio::spawn(async move { shop.orders.cancel_order(ALICE, order.id).await })
  });
  for joined in join_all(tasks).await {
    assert_eq!(joined.unwrap().unwrap().status.as_str(), "canceled");
  }

  assert_eq!(shop.inventory(lamp.id).await, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_additions_merge_into_one_line() {
  let shop = Shop::new();
  let lamp = shop.stock("Lamp", 150, 100).await;

  let tasks = (0..10).map(|_| {
    let shop = shop.clone();
    tokio::spawn(async move { shop.cart.add_item(ALICE, lamp.id, 1).await })
  });
  for joined in join_all(tasks).await {
    joined.unwrap().unwrap();
  }

  assert_eq!(shop.cart_contents(ALICE).await, vec![(lamp.id, 10)]);
}

#[tokio::test]
async fn lock_timeout_is_a_retryable_failure() {
  let shop = Shop::with_lock_timeout(Duration::from_millis(50));
  let lamp = shop.stock("Lamp", 150, 5).await;
  shop.cart.add_item(ALICE, lamp.id, 2).await.unwrap();

  let mut holder = shop.gateway.begin().await.unwrap();
  holder.lock_stock(lamp.id).await.unwrap();

  let err = shop.orders.create_order(ALICE).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
  assert!(err.is_retryable());
  assert_eq!(shop.cart_contents(ALICE).await, vec![(lamp.id, 2)]);
  assert_eq!(shop.order_count(ALICE).await, 0);

  holder.rollback().await.unwrap();
  let detail = shop.orders.create_order(ALICE).await.unwrap();
  assert_eq!(detail.order.total_price, 300);
  assert_eq!(shop.inventory(lamp.id).await, 3);
}
