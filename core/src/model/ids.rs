// storefront/src/model/ids.rs

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl $name {
      pub fn get(self) -> i64 {
        self.0
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
      }
    }

    impl From<i64> for $name {
      fn from(raw: i64) -> Self {
        $name(raw)
      }
    }
  };
}

id_type!(
  /// Identity of a catalog row. Ascending `StockId` is the global lock order.
  StockId
);
id_type!(
  /// Authenticated account, resolved outside this crate.
  UserId
);
id_type!(CartLineId);
id_type!(OrderId);
id_type!(OrderItemId);
