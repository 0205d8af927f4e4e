// core/src/flow/step.rs

use super::ContextData;
use std::sync::Arc;

pub type SkipCondition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  /// Once a pivot step completes, earlier compensations are no longer run.
  pub pivot: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("pivot", &self.pivot)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
