// tienda-flow/src/core/control.rs

//! Signals returned by handlers and the outcome of a whole run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
  /// Keep going with the remaining handlers and steps.
  Continue,
  /// Halt the run. Nothing else in this step or later steps executes.
  Stop,
}

/// Outcome of [`Flow::run`](crate::Flow::run) when no handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  Completed,
  Stopped,
}

impl FlowOutcome {
  pub fn is_completed(self) -> bool {
    matches!(self, FlowOutcome::Completed)
  }
}

impl From<FlowOutcome> for FlowControl {
  fn from(outcome: FlowOutcome) -> Self {
    match outcome {
      FlowOutcome::Completed => FlowControl::Continue,
      FlowOutcome::Stopped => FlowControl::Stop,
    }
  }
}
