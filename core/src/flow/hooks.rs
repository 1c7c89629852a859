// tienda-flow/src/flow/hooks.rs

//! Registration of `before`, `on` and `after` handlers.

use crate::core::context_data::ContextData;
use crate::core::control::FlowControl;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::flow::Flow;
use std::collections::HashMap;
use std::future::Future;

#[derive(Debug, Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn phase_map(&mut self, phase: Phase) -> &mut HashMap<String, Vec<Handler<T, E>>> {
    match phase {
      Phase::Before => &mut self.before_handlers,
      Phase::On => &mut self.on_handlers,
      Phase::After => &mut self.after_handlers,
    }
  }

  fn push_handler<F, HandlerErr>(
    &mut self,
    phase: Phase,
    step_name: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<FlowControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: Handler<T, E> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.phase_map(phase).entry(step_name.to_string()).or_default().push(handler);
  }

  /// Runs ahead of the step's `on` handlers; useful for guards and preloading.
  pub fn before<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<FlowControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.push_handler(Phase::Before, step_name, handler_fn);
  }

  /// The step's main work. Several `on` handlers run in registration order.
  pub fn on<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<FlowControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.push_handler(Phase::On, step_name, handler_fn);
  }

  pub fn after<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<FlowControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + Sync + 'static,
  {
    self.push_handler(Phase::After, step_name, handler_fn);
  }

  /// Attaches an already boxed handler to the `on` phase.
  pub fn on_boxed(&mut self, step_name: &str, handler: Handler<T, E>) {
    self.ensure_step_exists(step_name);
    self.on_handlers.entry(step_name.to_string()).or_default().push(handler);
  }
}
