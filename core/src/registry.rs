// tienda-flow/src/registry.rs

//! `FlowRegistry<E>`: flows keyed by their context type.
//!
//! A caller holding a `ContextData<T>` asks the registry to run "the flow for
//! `T`" without naming it. The registry answers with the application error `E`.

use crate::core::context_data::ContextData;
use crate::core::control::FlowOutcome;
use crate::error::FlowError;
use crate::flow::Flow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait AnyFlowRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr>;
}

struct FlowRunner<T, HandlerErr, AppErr>
where
  T: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<T, HandlerErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<T, HandlerErr, AppErr> AnyFlowRunner<AppErr> for FlowRunner<T, HandlerErr, AppErr>
where
  T: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr> {
    let ctx = match ctx.downcast::<ContextData<T>>() {
      Ok(ctx) => *ctx,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<T>>().to_string();
        event!(Level::ERROR, %expected_type, "Context type mismatch in registry dispatch.");
        return Err(AppErr::from(FlowError::TypeMismatch { expected_type }));
      }
    };
    self.flow.run(ctx).await.map_err(AppErr::from)
  }
}

/// Registry of flows keyed by the `TypeId` of their context data.
pub struct FlowRegistry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn AnyFlowRunner<AppErr>>>>,
}

impl<AppErr> FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `flow` for its context type, replacing any previous one.
  pub fn register<T, HandlerErr>(&self, flow: Flow<T, HandlerErr>)
  where
    T: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    event!(Level::DEBUG, context_type = %std::any::type_name::<T>(), steps = ?flow.step_names(), "Registering flow.");
    let runner = FlowRunner::<T, HandlerErr, AppErr> {
      flow: Arc::new(flow),
      _app_err: PhantomData,
    };
    self.flows.write().insert(TypeId::of::<T>(), Arc::new(runner));
  }

  pub fn is_registered<T: 'static + Send + Sync>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.flows.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.flows.read().is_empty()
  }

  /// Runs the flow registered for `T`.
  #[instrument(name = "FlowRegistry::run", skip_all, fields(context_type = %std::any::type_name::<T>()))]
  pub async fn run<T>(&self, ctx: ContextData<T>) -> Result<FlowOutcome, AppErr>
  where
    T: 'static + Send + Sync,
  {
    let runner = self.flows.read().get(&TypeId::of::<T>()).cloned().ok_or_else(|| {
      let type_name = std::any::type_name::<T>().to_string();
      event!(Level::ERROR, %type_name, "No flow registered for context type.");
      AppErr::from(FlowError::NotRegistered { type_name })
    })?;

    runner.run_erased(Box::new(ctx)).await
  }
}

impl<AppErr> Default for FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
