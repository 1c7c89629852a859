// tests/registry_tests.rs
mod common;

use common::*;
use tienda_flow::{ContextData, Flow, FlowControl, FlowOutcome, FlowRegistry};

#[derive(Debug, Default)]
struct RefundCtx {
  refunded: bool,
}

#[tokio::test]
async fn registry_dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut order_flow = Flow::<OrderCtx, TestError>::new(&[("price", false, None)]);
  order_flow.on_boxed("price", trail_handler("price"));
  registry.register(order_flow);

  let mut refund_flow = Flow::<RefundCtx, TestError>::new(&[("refund", false, None)]);
  refund_flow.on("refund", |ctx: ContextData<RefundCtx>| async move {
    ctx.write().refunded = true;
    Ok::<_, TestError>(FlowControl::Continue)
  });
  registry.register(refund_flow);

  assert_eq!(registry.len(), 2);
  assert!(registry.is_registered::<RefundCtx>());

  let order_ctx = ContextData::new(OrderCtx::default());
  assert_eq!(registry.run(order_ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(order_ctx.read().trail, vec!["price"]);

  let refund_ctx = ContextData::new(RefundCtx::default());
  registry.run(refund_ctx.clone()).await.unwrap();
  assert!(refund_ctx.read().refunded);
}

#[tokio::test]
async fn unregistered_context_type_is_reported() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();
  assert!(registry.is_empty());

  let err = registry.run(ContextData::new(RefundCtx::default())).await.unwrap_err();
  match err {
    TestError::Flow(msg) => assert!(msg.contains("NotRegistered")),
    other => panic!("unexpected error {:?}", other),
  }
}

#[tokio::test]
async fn registering_twice_replaces_the_flow() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut first = Flow::<OrderCtx, TestError>::new(&[("first", false, None)]);
  first.on_boxed("first", trail_handler("first"));
  registry.register(first);

  let mut second = Flow::<OrderCtx, TestError>::new(&[("second", false, None)]);
  second.on_boxed("second", trail_handler("second"));
  registry.register(second);

  let ctx = ContextData::new(OrderCtx::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(registry.len(), 1);
  assert_eq!(ctx.read().trail, vec!["second"]);
}
