// tienda-flow/src/branch/builder.rs

use crate::branch::arm::{AnyBranchArm, BranchArm};
use crate::core::context_data::ContextData;
use crate::core::control::FlowControl;
use crate::error::FlowError;
use crate::flow::Flow;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

/// Fluent builder returned by [`Flow::branch`].
///
/// ```ignore
/// flow
///   .branch("charge")
///   .arm(card_flow, |ctx| Ok(ctx.read().payment.clone()))
///   .when(|ctx| ctx.read().method == Method::Card)
///   .arm(wallet_flow, |ctx| Ok(ctx.read().payment.clone()))
///   .when(|ctx| ctx.read().method == Method::Wallet)
///   .fail_if_no_arm_matches()
///   .finalize();
/// ```
pub struct BranchBuilder<'flow, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: &'flow mut Flow<T, E>,
  step_name: String,
  arms: Vec<Arc<dyn AnyBranchArm<T, E>>>,
  // None means "raise NoBranchMatched".
  on_no_match: Option<FlowControl>,
}

impl<'flow, T, E> BranchBuilder<'flow, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) fn new(flow: &'flow mut Flow<T, E>, step_name: String) -> Self {
    Self {
      flow,
      step_name,
      arms: Vec::new(),
      on_no_match: Some(FlowControl::Continue),
    }
  }

  /// Starts an arm running `sub_flow` on the context returned by `extractor`.
  /// Complete it with [`BranchArmConfigurator::when`].
  pub fn arm<S>(
    self,
    sub_flow: Arc<Flow<S, E>>,
    extractor: impl Fn(ContextData<T>) -> Result<ContextData<S>, FlowError> + Send + Sync + 'static,
  ) -> BranchArmConfigurator<'flow, T, S, E>
  where
    S: 'static + Send + Sync,
  {
    BranchArmConfigurator {
      builder: self,
      sub_flow,
      extractor: Arc::new(extractor),
      _sub: PhantomData,
    }
  }

  /// What the step answers when no arm matches. Defaults to `Continue`.
  pub fn if_no_arm_matches(mut self, control: FlowControl) -> Self {
    self.on_no_match = Some(control);
    self
  }

  pub fn fail_if_no_arm_matches(mut self) -> Self {
    self.on_no_match = None;
    self
  }

  /// Installs the branch as the step's `on` handler. The first matching arm wins.
  pub fn finalize(self) {
    let BranchBuilder {
      flow,
      step_name,
      arms,
      on_no_match,
    } = self;
    let arms = Arc::new(arms);
    let captured_step = step_name.clone();

    flow.on(&step_name, move |ctx: ContextData<T>| {
      let arms = arms.clone();
      let step_name = captured_step.clone();
      async move {
        for (arm_idx, arm) in arms.iter().enumerate() {
          if arm.matches(ctx.clone()) {
            event!(Level::DEBUG, step_name = %step_name, arm_index = arm_idx, "Branch arm matched.");
            return arm.run(ctx, &step_name).await;
          }
        }
        match on_no_match {
          Some(control) => {
            event!(Level::DEBUG, step_name = %step_name, ?control, "No branch arm matched.");
            Ok(control)
          }
          None => Err(E::from(FlowError::NoBranchMatched { step_name })),
        }
      }
    });
  }
}

/// Intermediate state of [`BranchBuilder::arm`] waiting for its condition.
pub struct BranchArmConfigurator<'flow, T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  builder: BranchBuilder<'flow, T, E>,
  sub_flow: Arc<Flow<S, E>>,
  extractor: Arc<dyn Fn(ContextData<T>) -> Result<ContextData<S>, FlowError> + Send + Sync>,
  _sub: PhantomData<S>,
}

impl<'flow, T, S, E> BranchArmConfigurator<'flow, T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn when(
    self,
    condition: impl Fn(ContextData<T>) -> bool + Send + Sync + 'static,
  ) -> BranchBuilder<'flow, T, E> {
    let mut builder = self.builder;
    builder.arms.push(Arc::new(BranchArm {
      flow: self.sub_flow,
      extractor: self.extractor,
      condition: Arc::new(condition),
    }));
    builder
  }
}
