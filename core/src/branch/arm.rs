// tienda-flow/src/branch/arm.rs

use crate::core::context_data::ContextData;
use crate::core::control::FlowControl;
use crate::error::FlowError;
use crate::flow::Flow;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, Level};

pub(crate) type Extractor<T, S> = Arc<dyn Fn(ContextData<T>) -> Result<ContextData<S>, FlowError> + Send + Sync>;
pub(crate) type Condition<T> = Arc<dyn Fn(ContextData<T>) -> bool + Send + Sync>;

/// One arm of a branch: a sub-flow over `S`, how to get `S` out of `T`, and
/// when to take this arm.
pub(crate) struct BranchArm<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) flow: Arc<Flow<S, E>>,
  pub(crate) extractor: Extractor<T, S>,
  pub(crate) condition: Condition<T>,
}

/// Erases the sub-context type so arms over different `S` can share a list.
#[async_trait]
pub(crate) trait AnyBranchArm<T, E>: Send + Sync
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn matches(&self, ctx: ContextData<T>) -> bool;

  async fn run(&self, ctx: ContextData<T>, step_name: &str) -> Result<FlowControl, E>;
}

#[async_trait]
impl<T, S, E> AnyBranchArm<T, E> for BranchArm<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn matches(&self, ctx: ContextData<T>) -> bool {
    (self.condition)(ctx)
  }

  async fn run(&self, ctx: ContextData<T>, step_name: &str) -> Result<FlowControl, E> {
    let sub_ctx = (self.extractor)(ctx).map_err(|err| {
      event!(Level::ERROR, step_name, error = %err, "Branch extractor failed.");
      let err = match err {
        FlowError::HandlerError { source } | FlowError::ExtractorFailure { source, .. } => {
          FlowError::ExtractorFailure {
            step_name: step_name.to_string(),
            source,
          }
        }
        other => other,
      };
      E::from(err)
    })?;

    event!(
      Level::DEBUG,
      step_name,
      sub_context_type = %std::any::type_name::<S>(),
      "Running branch sub-flow."
    );
    let outcome = self.flow.run(sub_ctx).await?;
    Ok(outcome.into())
  }
}
