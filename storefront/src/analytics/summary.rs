// storefront/src/analytics/summary.rs

use crate::analytics::buckets::OrderPoint;
use crate::analytics::range::DateRange;
use crate::analytics::round2;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodTotals {
  pub revenue_cents: i64,
  pub orders: i64,
  pub new_customers: i64,
}

impl PeriodTotals {
  /// Totals over revenue-bearing points inside `range`.
  pub fn from_points(points: &[OrderPoint], range: &DateRange, new_customers: i64) -> Self {
    let (revenue_cents, orders) = points
      .iter()
      .filter(|p| p.status.is_revenue() && range.contains(p.created_at))
      .fold((0, 0), |(revenue, orders), p| (revenue + p.total_cents, orders + 1));
    Self {
      revenue_cents,
      orders,
      new_customers,
    }
  }

  pub fn average_order_value_cents(&self) -> i64 {
    if self.orders == 0 {
      0
    } else {
      self.revenue_cents / self.orders
    }
  }
}

/// Percentage change from `previous` to `current`, or `None` when there is no
/// previous value to compare against.
pub fn percent_change(current: i64, previous: i64) -> Option<f64> {
  if previous == 0 {
    return None;
  }
  Some(round2((current - previous) as f64 / previous as f64 * 100.0))
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
  pub range: DateRange,
  pub previous_range: DateRange,
  pub revenue_cents: i64,
  pub orders: i64,
  pub average_order_value_cents: i64,
  pub new_customers: i64,
  pub revenue_change_pct: Option<f64>,
  pub orders_change_pct: Option<f64>,
  pub average_order_value_change_pct: Option<f64>,
  pub new_customers_change_pct: Option<f64>,
}

pub fn summarize(range: DateRange, current: PeriodTotals, previous: PeriodTotals) -> DashboardSummary {
  DashboardSummary {
    range,
    previous_range: range.previous(),
    revenue_cents: current.revenue_cents,
    orders: current.orders,
    average_order_value_cents: current.average_order_value_cents(),
    new_customers: current.new_customers,
    revenue_change_pct: percent_change(current.revenue_cents, previous.revenue_cents),
    orders_change_pct: percent_change(current.orders, previous.orders),
    average_order_value_change_pct: percent_change(
      current.average_order_value_cents(),
      previous.average_order_value_cents(),
    ),
    new_customers_change_pct: percent_change(current.new_customers, previous.new_customers),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::OrderStatus;
  use chrono::{NaiveDate, TimeZone, Utc};

  #[test]
  fn percent_change_handles_zero_baseline() {
    assert_eq!(percent_change(150, 100), Some(50.0));
    assert_eq!(percent_change(50, 100), Some(-50.0));
    assert_eq!(percent_change(1, 3), Some(-66.67));
    assert_eq!(percent_change(10, 0), None);
    assert_eq!(percent_change(0, 0), None);
  }

  #[test]
  fn average_order_value_is_zero_without_orders() {
    assert_eq!(PeriodTotals::default().average_order_value_cents(), 0);
    let totals = PeriodTotals {
      revenue_cents: 10_001,
      orders: 2,
      new_customers: 0,
    };
    assert_eq!(totals.average_order_value_cents(), 5_000);
  }

  #[test]
  fn summary_compares_against_previous_period() {
    let day = |d| NaiveDate::from_ymd_opt(2026, 4, d).unwrap();
    let range = DateRange::from_dates(day(8), day(14)).unwrap();
    let points = vec![
      OrderPoint {
        created_at: Utc.with_ymd_and_hms(2026, 4, 9, 10, 0, 0).unwrap(),
        total_cents: 30_000,
        status: OrderStatus::Paid,
      },
      OrderPoint {
        created_at: Utc.with_ymd_and_hms(2026, 4, 10, 10, 0, 0).unwrap(),
        total_cents: 10_000,
        status: OrderStatus::Cancelled,
      },
    ];
    let current = PeriodTotals::from_points(&points, &range, 4);
    assert_eq!(current.revenue_cents, 30_000);
    assert_eq!(current.orders, 1);

    let previous = PeriodTotals {
      revenue_cents: 20_000,
      orders: 2,
      new_customers: 0,
    };
    let summary = summarize(range, current, previous);
    assert_eq!(summary.revenue_change_pct, Some(50.0));
    assert_eq!(summary.orders_change_pct, Some(-50.0));
    assert_eq!(summary.average_order_value_change_pct, Some(200.0));
    assert_eq!(summary.new_customers_change_pct, None);
    assert_eq!(summary.previous_range.end, range.start);
  }
}
