// tienda-flow/src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::FlowControl;
use std::future::Future;
use std::pin::Pin;

/// A boxed asynchronous step handler.
///
/// It receives a clone of the run's `ContextData<T>` and resolves to a
/// [`FlowControl`] or the flow's error type `E`. Lock guards taken on the
/// context must be dropped before the handler awaits anything.
pub type Handler<T, E> =
  Box<dyn Fn(ContextData<T>) -> Pin<Box<dyn Future<Output = Result<FlowControl, E>> + Send>> + Send + Sync>;
