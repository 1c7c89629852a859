// storefront/src/analytics/mod.rs

//! Dashboard aggregation.
//!
//! The database hands back raw rows (order points, per-category sums); the
//! functions here turn them into the series and ratios the admin dashboard
//! displays. All dates are UTC calendar dates.

pub mod buckets;
pub mod goal;
pub mod range;
pub mod rollup;
pub mod summary;

pub use buckets::{bucket_sales, OrderPoint, SalesBucket};
pub use goal::{goal_progress, GoalProgress};
pub use range::{DashboardQuery, DateRange, Granularity, RangePreset};
pub use rollup::{roll_up_categories, CategoryShare, CategorySalesRow, UNCATEGORIZED};
pub use summary::{percent_change, summarize, DashboardSummary, PeriodTotals};

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopProduct {
  pub product_id: Uuid,
  pub name: String,
  pub units: i64,
  pub revenue_cents: i64,
}

pub(crate) fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}
