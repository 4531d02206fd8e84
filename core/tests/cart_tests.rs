// tests/cart_tests.rs
mod common;
use common::*;
use storefront::model::{CartLineId, StockId};
use storefront::{Entity, ErrorKind, ShopError};

#[tokio::test]
async fn repeated_additions_merge_into_one_line() {
  let shop = Shop::new();
  let lamp = shop.stock("Lamp", 150, 10).await;

  let first = shop.cart.add_item(ALICE, lamp.id, 2).await.unwrap();
  let merged = shop.cart.add_item(ALICE, lamp.id, 3).await.unwrap();

  assert_eq!(first.id, merged.id);
  assert_eq!(merged.quantity, 5);
  assert_eq!(shop.cart_contents(ALICE).await, vec![(lamp.id, 5)]);
}

#[tokio::test]
async fn non_positive_quantity_counts_as_one() {
  let shop = Shop::new();
  let lamp = shop.stock("Lamp", 150, 10).await;

  assert_eq!(shop.cart.add_item(ALICE, lamp.id, 0).await.unwrap().quantity, 1);
  assert_eq!(shop.cart.add_item(ALICE, lamp.id, -7).await.unwrap().quantity, 2);
}

#[tokio::test]
async fn adding_checks_against_inventory() {
  let shop = Shop::new();
  let lamp = shop.stock("Lamp", 150, 3).await;

  let err = shop.cart.add_item(ALICE, lamp.id, 4).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InsufficientInventory);
  assert!(shop.cart_contents(ALICE).await.is_empty());

  shop.cart.add_item(ALICE, lamp.id, 2).await.unwrap();
  let err = shop.cart.add_item(ALICE, lamp.id, 2).await.unwrap_err();
  match err {
    ShopError::InsufficientInventory {
      stock_id,
      requested,
      available,
      ..
    } => assert_eq!((stock_id, requested, available), (lamp.id, 4, 3)),
    other => panic!("expected insufficient inventory, got {other:?}"),
  }
  assert_eq!(shop.cart_contents(ALICE).await, vec![(lamp.id, 2)]);
}

#[tokio::test]
async fn adding_a_missing_stock_is_not_found() {
  let shop = Shop::new();
  let err = shop.cart.add_item(ALICE, StockId(404), 1).await.unwrap_err();
  assert!(matches!(
    err,
    ShopError::NotFound {
      entity: Entity::Stock(StockId(404))
    }
  ));
}

#[tokio::test]
async fn update_quantity_validates_argument_ownership_and_inventory() {
  let shop = Shop::new();
  let lamp = shop.stock("Lamp", 150, 5).await;
  let line = shop.cart.add_item(ALICE, lamp.id, 1).await.unwrap();

  let err = shop.cart.update_quantity(ALICE, line.id, 0).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidArgument);

  let err = shop.cart.update_quantity(BOB, line.id, 2).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let err = shop.cart.update_quantity(ALICE, CartLineId(999), 2).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let err = shop.cart.update_quantity(ALICE, line.id, 6).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InsufficientInventory);

  let updated = shop.cart.update_quantity(ALICE, line.id, 5).await.unwrap();
  assert_eq!(updated.quantity, 5);
  assert_eq!(shop.cart_contents(ALICE).await, vec![(lamp.id, 5)]);
}

#[tokio::test]
async fn removal_is_idempotent_and_ownership_filtered() {
  let shop = Shop::new();
  let lamp = shop.stock("Lamp", 150, 5).await;
  let line = shop.cart.add_item(ALICE, lamp.id, 1).await.unwrap();

  shop.cart.remove_item(BOB, line.id).await.unwrap();
  assert_eq!(shop.cart_contents(ALICE).await, vec![(lamp.id, 1)]);

  shop.cart.remove_item(ALICE, line.id).await.unwrap();
  shop.cart.remove_item(ALICE, line.id).await.unwrap();
  assert!(shop.cart_contents(ALICE).await.is_empty());
}

#[tokio::test]
async fn listing_joins_stock_newest_first() {
  let shop = Shop::new();
  let lamp = shop.stock("Lamp", 150, 5).await;
  let desk = shop.stock("Desk", 900, 2).await;

  shop.cart.add_item(ALICE, lamp.id, 1).await.unwrap();
  shop.cart.add_item(ALICE, desk.id, 1).await.unwrap();
  shop.cart.add_item(BOB, lamp.id, 1).await.unwrap();

  let entries = shop.cart.list_items(ALICE).await.unwrap();
  let names: Vec<&str> = entries.iter().map(|entry| entry.stock.name.as_str()).collect();
  assert_eq!(names, vec!["Desk", "Lamp"]);
  assert_eq!(entries[0].stock.price, 900);
}
