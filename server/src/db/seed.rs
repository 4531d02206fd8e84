// storefront_server/src/db/seed.rs

use storefront::model::NewStock;
use storefront::{Gateway, ShopResult};
use tracing::{info, instrument};

fn demo_catalog() -> Vec<NewStock> {
  vec![
    NewStock {
      name: "Mechanical Keyboard".to_string(),
      price: 399,
      inventory: 20,
      category: "Electronics".to_string(),
      info: "Cool grey, minimal".to_string(),
    },
    NewStock {
      name: "Wireless Mouse".to_string(),
      price: 149,
      inventory: 30,
      category: "Electronics".to_string(),
      info: "Silent switches".to_string(),
    },
  ]
}

/// Inserts the demo products when the catalog is empty. Returns how many rows
/// were added.
#[instrument(name = "db::seed_catalog", skip(gateway), err(Display))]
pub async fn seed_catalog<G: Gateway>(gateway: &G) -> ShopResult<usize> {
  if !gateway.stocks().await?.is_empty() {
    info!("Catalog already populated; skipping seed.");
    return Ok(0);
  }
  let catalog = demo_catalog();
  let count = catalog.len();
  for stock in catalog {
    gateway.insert_stock(stock).await?;
  }
  info!(count, "Seeded demo catalog.");
  Ok(count)
}

#[cfg(test)]
mod tests {
  use super::*;
  use storefront::MemoryGateway;

  #[actix_rt::test]
  async fn seeds_only_an_empty_catalog() {
    let gateway = MemoryGateway::new();
    assert_eq!(seed_catalog(&gateway).await.unwrap(), 2);
    assert_eq!(seed_catalog(&gateway).await.unwrap(), 0);

    let names: Vec<String> = gateway.stocks().await.unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["Wireless Mouse", "Mechanical Keyboard"]);
  }
}
