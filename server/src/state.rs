// server/src/state.rs
use crate::config::AppConfig;
use jemo_core::Settlement;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub settlement: Arc<Settlement>,
  pub config: Arc<AppConfig>,
}
