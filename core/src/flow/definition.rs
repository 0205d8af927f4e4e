// core/src/flow/definition.rs

//! The `Flow<TData, Err>` definition: named steps, their handlers and the
//! compensations that undo them.

use super::context_data::ContextData;
use super::control::StepControl;
use super::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A step handler. Takes a clone of the shared context and resolves to a
/// `StepControl`. Lock guards must be released before awaiting.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<StepControl, Err>> + Send>> + Send + Sync,
>;

/// Undo action for a completed step. Runs only when a later step fails.
pub type Compensation<TData, Err> =
  Box<dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<(), Err>> + Send>> + Send + Sync>;

pub struct Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) compensations: HashMap<String, Compensation<TData, Err>>,
}

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a flow from `(name, optional, skip_if)` triples.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        pivot: false,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      on: HashMap::new(),
      compensations: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  fn position(&self, step_name: &str) -> usize {
    match self.steps.iter().position(|s| s.name == step_name) {
      Some(idx) => idx,
      // Setup error in the flow definition, not a runtime condition.
      None => panic!("Flow setup error: step '{}' not found in flow definition.", step_name),
    }
  }

  /// Marks a step whose effect cannot be undone, such as an external transfer.
  pub fn mark_pivot(&mut self, step_name: &str) {
    let idx = self.position(step_name);
    self.steps[idx].pivot = true;
  }

  /// Registers a handler for a step. Several handlers run in registration order.
  pub fn on_step<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StepControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.position(step_name);
    let handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers the undo action for a step, replacing any previous one.
  pub fn compensate_with<F, UserErr>(
    &mut self,
    step_name: &str,
    compensation_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<(), UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.position(step_name);
    let compensation: Compensation<TData, Err> = Box::new(move |ctx_data| {
      let fut = compensation_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.compensations.insert(step_name.to_string(), compensation);
  }
}
