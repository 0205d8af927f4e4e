// core/src/flow/control.rs

//! Signals for controlling flow execution and the outcome of a run.

/// Returned by a step handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  Continue,
  /// Halt the flow after this handler. Later steps do not run and nothing is compensated.
  Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  Completed,
  Stopped,
}
