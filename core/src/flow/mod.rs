// core/src/flow/mod.rs

//! Step workflow engine. A `Flow` is an ordered list of named steps run
//! against a shared `ContextData`; completed steps can register a
//! compensation that is run in reverse when a later step fails.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod registry;
pub mod step;

pub use context_data::ContextData;
pub use control::{FlowOutcome, StepControl};
pub use definition::{Compensation, Flow, Handler};
pub use registry::FlowRegistry;
pub use step::{SkipCondition, StepDef};
