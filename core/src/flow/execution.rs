// tienda-flow/src/flow/execution.rs

use crate::core::context_data::ContextData;
use crate::core::control::{FlowControl, FlowOutcome};
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::flow::Flow;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx`.
  ///
  /// Returns `Completed` when the last step finished, `Stopped` when a handler
  /// returned [`FlowControl::Stop`], or the first handler error.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(context_type = %std::any::type_name::<T>(), num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: ContextData<T>) -> Result<FlowOutcome, E> {
    event!(Level::DEBUG, "Flow run starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx.clone()) {
          event!(Level::INFO, step_name, "Step skipped by its skip condition.");
          continue;
        }
      }

      let before = non_empty(self.before_handlers.get(step_name));
      let on = non_empty(self.on_handlers.get(step_name));
      let after = non_empty(self.after_handlers.get(step_name));

      if before.is_none() && on.is_none() && after.is_none() {
        if step_def.optional {
          event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step_name, "Non-optional step has no handlers.");
        return Err(E::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let span = info_span!("flow_step", step_name, step_index = step_idx, optional = step_def.optional);
      let control = async {
        for (phase, handlers) in [("before", before), ("on", on), ("after", after)] {
          if let Some(handlers) = handlers {
            if run_phase(phase, handlers, &ctx).await? == FlowControl::Stop {
              return Ok::<_, E>(FlowControl::Stop);
            }
          }
        }
        Ok(FlowControl::Continue)
      }
      .instrument(span)
      .await?;

      if control == FlowControl::Stop {
        return Ok(FlowOutcome::Stopped);
      }
    }

    event!(Level::DEBUG, "Flow run completed.");
    Ok(FlowOutcome::Completed)
  }
}

fn non_empty<H>(handlers: Option<&Vec<H>>) -> Option<&Vec<H>> {
  handlers.filter(|v| !v.is_empty())
}

async fn run_phase<T, E>(phase: &'static str, handlers: &[Handler<T, E>], ctx: &ContextData<T>) -> Result<FlowControl, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler) in handlers.iter().enumerate() {
    match handler(ctx.clone()).await {
      Ok(FlowControl::Continue) => {}
      Ok(FlowControl::Stop) => {
        event!(Level::INFO, phase, handler_index = handler_idx, "Flow stopped by handler.");
        return Ok(FlowControl::Stop);
      }
      Err(e) => {
        event!(Level::ERROR, phase, handler_index = handler_idx, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(FlowControl::Continue)
}
