// storefront/src/model/mod.rs

//! Data structures for the entities the engine reads and writes.

pub mod cart_line;
pub mod ids;
pub mod order;
pub mod page;
pub mod stock;

pub use cart_line::{CartEntry, CartLine};
pub use ids::{CartLineId, OrderId, OrderItemId, StockId, UserId};
pub use order::{NewOrderItem, Order, OrderAction, OrderDetail, OrderItem, OrderStatus, Transition};
pub use page::{OrderPage, PageRequest};
pub use stock::{NewStock, Stock};
