// storefront/src/analytics/range.rs

use crate::errors::{AppError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Longest explicit range accepted, in days.
const MAX_RANGE_DAYS: i64 = 3 * 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePreset {
  Today,
  Last7Days,
  Last30Days,
  ThisMonth,
  ThisYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
  Day,
  Week,
  Month,
}

impl Granularity {
  pub fn auto(range: &DateRange) -> Self {
    match range.days() {
      d if d <= 31 => Granularity::Day,
      d if d <= 182 => Granularity::Week,
      _ => Granularity::Month,
    }
  }
}

/// Half-open `[start, end)` interval aligned to midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
  Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

impl DateRange {
  /// Covers the calendar days `from..=to`.
  pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Result<Self> {
    if to < from {
      return Err(AppError::Validation(format!(
        "Range end {} is before its start {}.",
        to, from
      )));
    }
    let range = Self {
      start: midnight(from),
      end: midnight(to) + Duration::days(1),
    };
    if range.days() > MAX_RANGE_DAYS {
      return Err(AppError::Validation(format!(
        "Ranges are limited to {} days.",
        MAX_RANGE_DAYS
      )));
    }
    Ok(range)
  }

  /// Resolves a preset relative to `now`. Ranges end with the current day.
  pub fn from_preset(preset: RangePreset, now: DateTime<Utc>) -> Self {
    let today = now.date_naive();
    let start_date = match preset {
      RangePreset::Today => today,
      RangePreset::Last7Days => today - Duration::days(6),
      RangePreset::Last30Days => today - Duration::days(29),
      RangePreset::ThisMonth => today.with_day(1).unwrap_or(today),
      RangePreset::ThisYear => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
    };
    Self {
      start: midnight(start_date),
      end: midnight(today) + Duration::days(1),
    }
  }

  pub fn days(&self) -> i64 {
    (self.end - self.start).num_days()
  }

  /// The range of equal length ending where this one starts.
  pub fn previous(&self) -> Self {
    let length = self.end - self.start;
    Self {
      start: self.start - length,
      end: self.start,
    }
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && at < self.end
  }

  pub fn first_day(&self) -> NaiveDate {
    self.start.date_naive()
  }

  /// Last calendar day inside the range.
  pub fn last_day(&self) -> NaiveDate {
    (self.end - Duration::days(1)).date_naive()
  }
}

/// Query string shared by the dashboard endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
  pub preset: Option<RangePreset>,
  pub from: Option<NaiveDate>,
  pub to: Option<NaiveDate>,
  pub granularity: Option<Granularity>,
  pub limit: Option<i64>,
}

impl DashboardQuery {
  /// Explicit `from`/`to` win over a preset; with neither, the last 30 days.
  pub fn resolve(&self, now: DateTime<Utc>) -> Result<(DateRange, Granularity)> {
    let range = match (self.from, self.to) {
      (Some(from), Some(to)) => DateRange::from_dates(from, to)?,
      (None, None) => DateRange::from_preset(self.preset.unwrap_or(RangePreset::Last30Days), now),
      _ => {
        return Err(AppError::Validation(
          "Both 'from' and 'to' are required for a custom range.".to_string(),
        ))
      }
    };
    let granularity = self.granularity.unwrap_or_else(|| Granularity::auto(&range));
    Ok((range, granularity))
  }
}
