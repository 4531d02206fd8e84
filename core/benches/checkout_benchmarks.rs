use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storefront::model::{NewStock, StockId, UserId};
use storefront::{CartAggregator, Gateway, MemoryGateway, OrderEngine};
use tokio::runtime::Runtime; // To run async code within Criterion

struct BenchShop {
  cart: CartAggregator<MemoryGateway>,
  orders: OrderEngine<MemoryGateway>,
  stocks: Vec<StockId>,
}

async fn bench_shop(num_stocks: usize, inventory: i64) -> BenchShop {
  let gateway = Arc::new(MemoryGateway::new());
  let mut stocks = Vec::with_capacity(num_stocks);
  for i in 0..num_stocks {
    let stock = gateway
      .insert_stock(NewStock {
        name: format!("item_{}", i),
        price: 100 + i as i64,
        inventory,
        category: "Bench".to_string(),
        info: String::new(),
      })
      .await
      .unwrap();
    stocks.push(stock.id);
  }
  BenchShop {
    cart: CartAggregator::new(Arc::clone(&gateway)),
    orders: OrderEngine::new(gateway),
    stocks,
  }
}

// Cart setup is excluded from the measured time.
fn bench_single_checkout(c: &mut Criterion) {
  let mut group = c.benchmark_group("SingleCheckout");
  let rt = Runtime::new().unwrap();

  for num_lines in [1usize, 5, 10].iter() {
    group.throughput(Throughput::Elements(*num_lines as u64));
    group.bench_with_input(
      BenchmarkId::new("lines", num_lines),
      num_lines,
      |b, &num_lines| {
        b.to_async(&rt).iter_custom(|iters| async move {
          let shop = bench_shop(num_lines, i64::MAX / 2).await;
          let mut elapsed = Duration::ZERO;
          for i in 0..iters {
            let user = UserId(i as i64 + 1);
            for &stock in &shop.stocks {
              shop.cart.add_item(user, stock, 1).await.unwrap();
            }
            let start = Instant::now();
            black_box(shop.orders.create_order(user).await.unwrap());
            elapsed += start.elapsed();
          }
          elapsed
        });
      },
    );
  }
  group.finish();
}

// Many buyers checking out the same stock rows at once.
fn bench_contended_checkout(c: &mut Criterion) {
  let mut group = c.benchmark_group("ContendedCheckout");
  let rt = tokio::runtime::Builder::new_multi_thread()
    .worker_threads(4)
    .enable_all()
    .build()
    .unwrap();

  for buyers in [4usize, 16, 64].iter() {
    group.throughput(Throughput::Elements(*buyers as u64));
    group.bench_with_input(BenchmarkId::new("buyers", buyers), buyers, |b, &buyers| {
      b.to_async(&rt).iter_custom(|iters| async move {
        let mut elapsed = Duration::ZERO;
        for _ in 0..iters {
          let shop = Arc::new(bench_shop(3, i64::MAX / 2).await);
          for buyer in 0..buyers {
            for &stock in &shop.stocks {
              shop.cart.add_item(UserId(buyer as i64), stock, 1).await.unwrap();
            }
          }
          let start = Instant::now();
          let tasks = (0..buyers).map(|buyer| {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.orders.create_order(UserId(buyer as i64)).await })
          });
          for joined in join_all(tasks).await {
            black_box(joined.unwrap().unwrap());
          }
          elapsed += start.elapsed();
        }
        elapsed
      });
    });
  }
  group.finish();
}

criterion_group!(benches, bench_single_checkout, bench_contended_checkout);
criterion_main!(benches);
