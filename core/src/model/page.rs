// storefront/src/model/page.rs

use serde::{Deserialize, Serialize};

use super::Order;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

/// A normalized page request. Construction never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  page: i64,
  page_size: i64,
}

impl PageRequest {
  /// `page` defaults to 1 and never goes below it; `page_size` defaults to
  /// [`DEFAULT_PAGE_SIZE`] and is clamped to `1..=MAX_PAGE_SIZE`.
  pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    PageRequest { page, page_size }
  }

  pub fn page(&self) -> i64 {
    self.page
  }

  pub fn page_size(&self) -> i64 {
    self.page_size
  }

  pub fn offset(&self) -> i64 {
    (self.page - 1).saturating_mul(self.page_size)
  }
}

impl Default for PageRequest {
  fn default() -> Self {
    PageRequest::new(None, None)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
  pub total: i64,
  pub page: i64,
  pub page_size: i64,
  pub list: Vec<Order>,
}
