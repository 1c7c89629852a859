// storefront/src/analytics/buckets.rs

use crate::analytics::range::{DateRange, Granularity};
use crate::models::OrderStatus;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeMap;

/// One order as seen by the dashboard.
#[derive(Debug, Clone, FromRow)]
pub struct OrderPoint {
  pub created_at: DateTime<Utc>,
  pub total_cents: i64,
  pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesBucket {
  pub label: String,
  pub start: NaiveDate,
  pub revenue_cents: i64,
  pub orders: i64,
}

pub fn bucket_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
  match granularity {
    Granularity::Day => date,
    Granularity::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
    Granularity::Month => date.with_day(1).unwrap_or(date),
  }
}

fn next_bucket(start: NaiveDate, granularity: Granularity) -> NaiveDate {
  match granularity {
    Granularity::Day => start + Duration::days(1),
    Granularity::Week => start + Duration::days(7),
    Granularity::Month => {
      let (year, month) = if start.month() == 12 {
        (start.year() + 1, 1)
      } else {
        (start.year(), start.month() + 1)
      };
      NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start + Duration::days(31))
    }
  }
}

pub fn bucket_label(start: NaiveDate, granularity: Granularity) -> String {
  match granularity {
    Granularity::Day => start.format("%Y-%m-%d").to_string(),
    Granularity::Week => {
      let week = start.iso_week();
      format!("{}-W{:02}", week.year(), week.week())
    }
    Granularity::Month => start.format("%Y-%m").to_string(),
  }
}

/// Revenue and order counts per bucket. Every bucket overlapping `range` is
/// present, in ascending order, even when no order falls into it. Points
/// outside the range or in non-revenue statuses are ignored.
pub fn bucket_sales(points: &[OrderPoint], range: &DateRange, granularity: Granularity) -> Vec<SalesBucket> {
  let mut buckets: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
  let last_day = range.last_day();
  let mut cursor = bucket_start(range.first_day(), granularity);
  while cursor <= last_day {
    buckets.insert(cursor, (0, 0));
    cursor = next_bucket(cursor, granularity);
  }

  for point in points.iter().filter(|p| p.status.is_revenue() && range.contains(p.created_at)) {
    let key = bucket_start(point.created_at.date_naive(), granularity);
    if let Some((revenue, orders)) = buckets.get_mut(&key) {
      *revenue += point.total_cents;
      *orders += 1;
    }
  }

  buckets
    .into_iter()
    .map(|(start, (revenue_cents, orders))| SalesBucket {
      label: bucket_label(start, granularity),
      start,
      revenue_cents,
      orders,
    })
    .collect()
}
