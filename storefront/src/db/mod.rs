// storefront/src/db/mod.rs

//! sqlx repositories. Functions take any `PgExecutor` so the same query runs
//! against the pool or inside a transaction (`&mut *tx`).

pub mod addresses;
pub mod analytics;
pub mod categories;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: i64 = 100;
const DEFAULT_PER_PAGE: i64 = 20;

/// `?page=&per_page=` query parameters, 1-based.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Page {
  #[serde(default = "first_page")]
  pub page: i64,
  #[serde(default = "default_per_page")]
  pub per_page: i64,
}

fn first_page() -> i64 {
  1
}

fn default_per_page() -> i64 {
  DEFAULT_PER_PAGE
}

impl Default for Page {
  fn default() -> Self {
    Self {
      page: 1,
      per_page: DEFAULT_PER_PAGE,
    }
  }
}

impl Page {
  /// Clamps to `page >= 1` and `1 <= per_page <= MAX_PER_PAGE`.
  pub fn normalized(self) -> Self {
    Self {
      page: self.page.max(1),
      per_page: self.per_page.clamp(1, MAX_PER_PAGE),
    }
  }

  pub fn limit(&self) -> i64 {
    self.normalized().per_page
  }

  pub fn offset(&self) -> i64 {
    let p = self.normalized();
    (p.page - 1) * p.per_page
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
  pub items: Vec<T>,
  pub page: i64,
  pub per_page: i64,
  pub total: i64,
}

impl<T> Paginated<T> {
  pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
    let page = page.normalized();
    Self {
      items,
      page: page.page,
      per_page: page.per_page,
      total,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_is_clamped() {
    let p = Page { page: 0, per_page: 500 };
    assert_eq!(p.limit(), MAX_PER_PAGE);
    assert_eq!(p.offset(), 0);

    let p = Page { page: 3, per_page: 10 };
    assert_eq!(p.offset(), 20);

    let p = Page { page: 2, per_page: 0 };
    assert_eq!(p.limit(), 1);
    assert_eq!(p.offset(), 1);
  }
}
