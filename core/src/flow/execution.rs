// core/src/flow/execution.rs

//! `Flow::run`: executes steps in order and unwinds completed steps on failure.

use super::context_data::ContextData;
use super::control::{FlowOutcome, StepControl};
use super::definition::Flow;
use crate::error::FlowError;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx_data`.
  ///
  /// When a handler fails, the compensations of the steps that already
  /// completed run in reverse order, unless a pivot step has completed in
  /// between. The handler's error is returned either way; a failing
  /// compensation is logged and does not replace it.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(
      flow_context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<FlowOutcome, Err> {
    event!(Level::DEBUG, "Flow execution starting.");
    let mut completed: Vec<&str> = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(
        Level::INFO,
        "flow_step",
        step_name = step_name,
        step_index = step_idx,
        pivot = step_def.pivot
      );

      if let Some(skip_cond) = &step_def.skip_if {
        if skip_cond(ctx_data.clone()) {
          event!(parent: &step_span, Level::INFO, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let handlers = match self.on.get(step_name) {
        Some(handlers) if !handlers.is_empty() => handlers,
        _ if step_def.optional => {
          event!(parent: &step_span, Level::DEBUG, "Optional step has no handlers, skipping.");
          continue;
        }
        _ => {
          event!(parent: &step_span, Level::ERROR, "Non-optional step has no handlers.");
          let err = Err::from(FlowError::HandlerMissing {
            step_name: step_def.name.clone(),
          });
          self.unwind(&completed, ctx_data.clone()).await;
          return Err(err);
        }
      };

      for handler_fn in handlers {
        match handler_fn(ctx_data.clone()).instrument(step_span.clone()).await {
          Ok(StepControl::Continue) => {}
          Ok(StepControl::Stop) => {
            event!(parent: &step_span, Level::INFO, "Flow stopped by step handler.");
            return Ok(FlowOutcome::Stopped);
          }
          Err(e) => {
            event!(parent: &step_span, Level::WARN, error = %e, "Step handler failed.");
            self.unwind(&completed, ctx_data.clone()).await;
            return Err(e);
          }
        }
      }

      if step_def.pivot {
        // Past the point of no return.
        completed.clear();
      } else {
        completed.push(step_name);
      }
      event!(parent: &step_span, Level::DEBUG, "Step finished.");
    }

    event!(Level::DEBUG, "Flow execution completed.");
    Ok(FlowOutcome::Completed)
  }

  async fn unwind(&self, completed: &[&str], ctx_data: ContextData<TData>) {
    for step_name in completed.iter().rev() {
      let Some(compensation) = self.compensations.get(*step_name) else {
        continue;
      };
      event!(Level::INFO, step_name = *step_name, "Compensating step.");
      if let Err(e) = compensation(ctx_data.clone()).await {
        event!(Level::ERROR, step_name = *step_name, error = %e, "Compensation failed.");
      }
    }
  }
}
