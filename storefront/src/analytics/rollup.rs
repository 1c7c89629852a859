// storefront/src/analytics/rollup.rs

use crate::analytics::round2;
use serde::Serialize;
use sqlx::FromRow;
use std::collections::HashMap;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Per-category sums as returned by the database; `category` is `None` for
/// products without one.
#[derive(Debug, Clone, FromRow)]
pub struct CategorySalesRow {
  pub category: Option<String>,
  pub revenue_cents: i64,
  pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
  pub category: String,
  pub revenue_cents: i64,
  pub units: i64,
  pub share_pct: f64,
}

/// Merges rows by category name and computes each one's share of total revenue.
/// Sorted by revenue descending, then name.
pub fn roll_up_categories(rows: &[CategorySalesRow]) -> Vec<CategoryShare> {
  let mut merged: HashMap<&str, (i64, i64)> = HashMap::new();
  for row in rows {
    let name = row.category.as_deref().unwrap_or(UNCATEGORIZED);
    let entry = merged.entry(name).or_insert((0, 0));
    entry.0 += row.revenue_cents;
    entry.1 += row.units;
  }

  let total: i64 = merged.values().map(|(revenue, _)| revenue).sum();
  let mut shares: Vec<CategoryShare> = merged
    .into_iter()
    .map(|(name, (revenue_cents, units))| CategoryShare {
      category: name.to_string(),
      revenue_cents,
      units,
      share_pct: if total > 0 {
        round2(revenue_cents as f64 / total as f64 * 100.0)
      } else {
        0.0
      },
    })
    .collect();

  shares.sort_by(|a, b| {
    b.revenue_cents
      .cmp(&a.revenue_cents)
      .then_with(|| a.category.cmp(&b.category))
  });
  shares
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(category: Option<&str>, revenue: i64, units: i64) -> CategorySalesRow {
    CategorySalesRow {
      category: category.map(String::from),
      revenue_cents: revenue,
      units,
    }
  }

  #[test]
  fn shares_sum_to_about_one_hundred() {
    let rows = vec![
      row(Some("Ropa"), 1_000, 3),
      row(Some("Hogar"), 1_000, 1),
      row(None, 1_000, 2),
    ];
    let shares = roll_up_categories(&rows);
    let total: f64 = shares.iter().map(|s| s.share_pct).sum();
    assert!((total - 100.0).abs() < 0.05);
    let names: Vec<_> = shares.iter().map(|s| s.category.as_str()).collect();
    assert_eq!(names, ["Hogar", "Ropa", UNCATEGORIZED]);
  }

  #[test]
  fn rows_with_same_category_are_merged_and_sorted_by_revenue() {
    let rows = vec![
      row(Some("Ropa"), 2_000, 1),
      row(Some("Tecnología"), 5_000, 1),
      row(Some("Ropa"), 4_000, 2),
    ];
    let shares = roll_up_categories(&rows);
    assert_eq!(shares[0].category, "Ropa");
    assert_eq!(shares[0].revenue_cents, 6_000);
    assert_eq!(shares[0].units, 3);
    assert_eq!(shares[0].share_pct, 54.55);
    assert_eq!(shares[1].share_pct, 45.45);
  }

  #[test]
  fn zero_revenue_yields_zero_shares() {
    let shares = roll_up_categories(&[row(Some("Ropa"), 0, 0)]);
    assert_eq!(shares[0].share_pct, 0.0);
    assert!(roll_up_categories(&[]).is_empty());
  }
}
