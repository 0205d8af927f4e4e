// core/src/flow/registry.rs

//! `FlowRegistry<E>`: one flow per context type, looked up by `TypeId`.

use super::context_data::ContextData;
use super::control::FlowOutcome;
use super::definition::Flow;
use crate::error::FlowError;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait AnyFlowRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` must hold a `ContextData<TData>` for the wrapped flow.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr>;
}

struct FlowWrapper<TData, FlowErr, AppErr>
where
  TData: 'static + Send + Sync,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<FlowErr> + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<TData, FlowErr>>,
  _phantom: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<TData, FlowErr, AppErr> AnyFlowRunner<AppErr> for FlowWrapper<TData, FlowErr, AppErr>
where
  TData: 'static + Send + Sync,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<FlowErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr> {
    let typed_ctx = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>();
        event!(Level::ERROR, "Context object type mismatch. Expected {}.", expected_type);
        return Err(AppErr::from(FlowError::TypeMismatch {
          step_name: "registry_dispatch".to_string(),
          expected_type: expected_type.to_string(),
        }));
      }
    };
    self.flow.run(typed_ctx).await.map_err(AppErr::from)
  }
}

pub struct FlowRegistry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn AnyFlowRunner<AppErr>>>>,
}

impl<AppErr> Default for FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
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

  /// Registers `flow` for its context type. A later registration for the same
  /// type replaces the earlier one.
  pub fn register_flow<TData, FlowErr>(&self, flow: Flow<TData, FlowErr>)
  where
    TData: 'static + Send + Sync,
    FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<FlowErr>,
  {
    event!(Level::DEBUG, context_type = %std::any::type_name::<TData>(), "Registering flow.");
    let wrapper = FlowWrapper::<TData, FlowErr, AppErr> {
      flow: Arc::new(flow),
      _phantom: PhantomData,
    };
    self.flows.write().insert(TypeId::of::<TData>(), Arc::new(wrapper));
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<TData>())
  }

  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<FlowOutcome, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = {
      let flows = self.flows.read();
      flows.get(&TypeId::of::<TData>()).cloned()
    };
    let Some(runner) = runner else {
      let type_name = std::any::type_name::<TData>();
      event!(Level::ERROR, "No flow registered for context type {}.", type_name);
      return Err(AppErr::from(FlowError::ConfigurationError {
        step_name: "FlowRegistry::run".to_string(),
        message: format!("No flow registered for context type {}", type_name),
      }));
    };
    runner.run_erased(Box::new(ctx_data)).await
  }
}
