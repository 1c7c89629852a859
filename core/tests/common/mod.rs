// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use tienda_flow::{ContextData, FlowControl, FlowError, Handler};
use tracing::Level;

/// Toy checkout context used across the engine tests.
#[derive(Clone, Debug, Default)]
pub struct OrderCtx {
  pub total_cents: i64,
  pub method: String,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
  pub charge: Option<ContextData<ChargeCtx>>,
}

#[derive(Clone, Debug, Default)]
pub struct ChargeCtx {
  pub amount_cents: i64,
  pub provider: String,
  pub approved: bool,
  pub decline: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Appends `label` to the trail, honouring `stop_at`.
pub fn trail_handler(label: &'static str) -> Handler<OrderCtx, TestError> {
  Box::new(move |ctx: ContextData<OrderCtx>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.trail.push(label.to_string());
      if guard.stop_at.as_deref() == Some(label) {
        return Ok(FlowControl::Stop);
      }
      Ok(FlowControl::Continue)
    })
  })
}

pub fn failing_handler(label: &'static str, message: &'static str) -> Handler<OrderCtx, TestError> {
  Box::new(move |ctx: ContextData<OrderCtx>| {
    Box::pin(async move {
      ctx.write().trail.push(label.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub static EXTRACTOR_CALLS: AtomicUsize = AtomicUsize::new(0);

pub fn reset_counters() {
  EXTRACTOR_CALLS.store(0, Ordering::SeqCst);
}
