// storefront/src/analytics/goal.rs

use crate::analytics::round2;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
  pub goal_cents: i64,
  pub actual_cents: i64,
  /// Percentage in `0..=100`.
  pub progress_pct: f64,
  pub remaining_cents: i64,
  pub achieved: bool,
}

pub fn goal_progress(actual_cents: i64, goal_cents: i64) -> GoalProgress {
  if goal_cents <= 0 {
    return GoalProgress {
      goal_cents,
      actual_cents,
      progress_pct: 0.0,
      remaining_cents: 0,
      achieved: false,
    };
  }
  let raw = actual_cents as f64 / goal_cents as f64 * 100.0;
  GoalProgress {
    goal_cents,
    actual_cents,
    progress_pct: round2(raw.clamp(0.0, 100.0)),
    remaining_cents: (goal_cents - actual_cents).max(0),
    achieved: actual_cents >= goal_cents,
  }
}
